//! Codec error types.
//!
//! Every failure while framing, serializing or parsing a message surfaces as a
//! [`ProtocolError`]. There is no partial decode: a frame either yields a
//! complete [`crate::Message`] or an error.

use thiserror::Error;

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced by the wire codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Fewer bytes than a frame header
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Minimum number of bytes required
        expected: usize,
        /// Number of bytes available
        actual: usize,
    },

    /// Header claims more payload bytes than were supplied
    #[error("frame truncated: header claims {expected} payload bytes, got {actual}")]
    FrameTruncated {
        /// Payload size claimed by the header
        expected: usize,
        /// Payload bytes actually available
        actual: usize,
    },

    /// Magic number mismatch
    #[error("invalid magic number")]
    InvalidMagic,

    /// Protocol version not understood by this build
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// Payload exceeds the frame size limit
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Actual payload size
        size: usize,
        /// Maximum allowed size
        max: usize,
    },

    /// Header carries an opcode this build does not know
    #[error("unknown opcode: {0:#04x}")]
    UnknownOpcode(u8),

    /// Header names a payload format that is unknown or not compiled in
    #[error("unsupported payload format: {0:#04x}")]
    UnsupportedFormat(u8),

    /// Payload serialization failed
    #[error("encode failed: {0}")]
    Encode(String),

    /// Payload deserialization failed
    #[error("decode failed: {0}")]
    Decode(String),
}
