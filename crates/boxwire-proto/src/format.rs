//! Pluggable payload serialization.
//!
//! Two formats carry the same serde data model: compact CBOR (feature `cbor`,
//! on by default) and JSON text as the always-available fallback. The format
//! is recorded in every frame header, so decoding never depends on how the
//! receiving side was configured.

use bytes::BufMut;
use serde::{Serialize, de::DeserializeOwned};

use crate::errors::{ProtocolError, Result};

/// Payload serialization format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireFormat {
    /// CBOR tagged maps (binary)
    Cbor,
    /// JSON objects (text)
    Json,
}

impl Default for WireFormat {
    fn default() -> Self {
        Self::preferred()
    }
}

impl WireFormat {
    /// Binary when compiled in, JSON otherwise.
    #[must_use]
    pub const fn preferred() -> Self {
        if cfg!(feature = "cbor") { Self::Cbor } else { Self::Json }
    }

    /// Format byte stored in the frame header.
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Cbor => 0x01,
            Self::Json => 0x02,
        }
    }

    /// Parse a header format byte. `None` if unrecognized.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Cbor),
            0x02 => Some(Self::Json),
            _ => None,
        }
    }

    /// Whether this build can encode and decode the format.
    #[must_use]
    pub const fn is_available(self) -> bool {
        match self {
            Self::Cbor => cfg!(feature = "cbor"),
            Self::Json => true,
        }
    }

    /// Serialize `value` into `dst`.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnsupportedFormat` if the format is not compiled in
    /// - `ProtocolError::Encode` if serialization fails
    pub fn write<T: Serialize>(self, value: &T, dst: &mut impl BufMut) -> Result<()> {
        match self {
            #[cfg(feature = "cbor")]
            Self::Cbor => ciborium::ser::into_writer(value, dst.writer())
                .map_err(|e| ProtocolError::Encode(e.to_string())),
            #[cfg(not(feature = "cbor"))]
            Self::Cbor => Err(ProtocolError::UnsupportedFormat(self.to_u8())),
            Self::Json => serde_json::to_writer(dst.writer(), value)
                .map_err(|e| ProtocolError::Encode(e.to_string())),
        }
    }

    /// Deserialize a complete value from `bytes`.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnsupportedFormat` if the format is not compiled in
    /// - `ProtocolError::Decode` if the bytes are not a valid `T`
    pub fn read<T: DeserializeOwned>(self, bytes: &[u8]) -> Result<T> {
        match self {
            #[cfg(feature = "cbor")]
            Self::Cbor => {
                ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::Decode(e.to_string()))
            },
            #[cfg(not(feature = "cbor"))]
            Self::Cbor => Err(ProtocolError::UnsupportedFormat(self.to_u8())),
            Self::Json => {
                serde_json::from_slice(bytes).map_err(|e| ProtocolError::Decode(e.to_string()))
            },
        }
    }
}

impl std::str::FromStr for WireFormat {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cbor" => Ok(Self::Cbor),
            "json" => Ok(Self::Json),
            other => Err(ProtocolError::Decode(format!("unknown wire format: {other}"))),
        }
    }
}
