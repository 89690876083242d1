//! Fuzz target for Message::read_payload
//!
//! Feeds the same bytes to every opcode in both payload formats to find:
//! - Type confusion (payload shaped for another message)
//! - Deeply nested widget trees or values
//! - Oversized strings and collections
//!
//! Decoding must never panic. Anything that decodes must encode again.

#![no_main]

use boxwire_proto::{Message, Opcode, WireFormat};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    for format in [WireFormat::Cbor, WireFormat::Json] {
        if !format.is_available() {
            continue;
        }
        for opcode in Opcode::ALL {
            if let Ok(message) = Message::read_payload(opcode, format, data) {
                assert_eq!(message.opcode(), opcode);
                let _ = message.encode(format);
            }
        }
    }
});
