//! Fuzz target for Frame::decode
//!
//! Arbitrary bytes either decode into a frame whose re-encoding is identical,
//! or fail with a structured error. The decoder must never panic.

#![no_main]

use boxwire_proto::{Frame, FrameHeader};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(frame) = Frame::decode(data) else {
        return;
    };

    let encoded = frame.to_bytes();
    assert_eq!(encoded.len(), frame.encoded_len());
    assert!(encoded.len() >= FrameHeader::SIZE);
    assert_eq!(&encoded[..], &data[..encoded.len()]);
});
