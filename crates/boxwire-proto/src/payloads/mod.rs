//! Session envelopes.
//!
//! Frame headers are raw binary, payloads are serde maps in the frame's
//! [`WireFormat`]. The [`Message`] enum covers the whole protocol: the
//! handshake (`Join`, `Set`), the render loop (`Output`, `Input`), context
//! switches (`Switch`) and error reports (`Error`).
//!
//! # Invariants
//!
//! Each message variant maps to exactly one opcode (enforced by match
//! exhaustiveness). Round-trip encoding must produce identical values in every
//! format.

pub mod render;
pub mod session;

use bytes::{BufMut, Bytes};
pub use render::{Input, InputEntry, Output};
pub use session::{ErrorPayload, Join, Plugin, Script, Settings, Switch, Theme};

use crate::{
    Frame, FrameHeader, Opcode, WireFormat,
    errors::{ProtocolError, Result},
};

/// All protocol messages.
///
/// The message type is determined by the `Opcode` in the frame header, so only
/// the inner struct is serialized (no variant tag in the payload).
///
/// # Security
///
/// - No Variant Tag: the header's opcode is the only discriminator, so a peer
///   cannot send a payload that claims to be a different message than its
///   header says.
/// - Exhaustive Matching: adding a variant breaks `opcode()`, `encode()` and
///   `decode()` at compile time until it is handled everywhere.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Client handshake
    Join(Join),
    /// Session settings (handshake ack or out-of-band push)
    Set(Settings),
    /// Rendered widget tree
    Output(Output),
    /// User input values
    Input(Input),
    /// Context switch request or acknowledgement
    Switch(Switch),
    /// Error report
    Error(ErrorPayload),
}

impl Message {
    /// Opcode corresponding to this message type.
    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::Join(_) => Opcode::Join,
            Self::Set(_) => Opcode::Set,
            Self::Output(_) => Opcode::Output,
            Self::Input(_) => Opcode::Input,
            Self::Switch(_) => Opcode::Switch,
            Self::Error(_) => Opcode::Error,
        }
    }

    /// Serialize only the inner struct into `dst`.
    ///
    /// Does not enforce the frame size limit; [`Frame::new`] does.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnsupportedFormat` if `format` is not compiled in
    /// - `ProtocolError::Encode` if serialization fails
    pub fn write_payload(&self, format: WireFormat, dst: &mut impl BufMut) -> Result<()> {
        match self {
            Self::Join(inner) => format.write(inner, dst),
            Self::Set(inner) => format.write(inner, dst),
            Self::Output(inner) => format.write(inner, dst),
            Self::Input(inner) => format.write(inner, dst),
            Self::Switch(inner) => format.write(inner, dst),
            Self::Error(inner) => format.write(inner, dst),
        }
    }

    /// Parse a payload given its opcode and format.
    ///
    /// # Security
    ///
    /// The size check happens before parsing begins, so the deserializer never
    /// sees more than [`FrameHeader::MAX_PAYLOAD_SIZE`] bytes.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::PayloadTooLarge` if bytes exceed the limit
    /// - `ProtocolError::UnsupportedFormat` if `format` is not compiled in
    /// - `ProtocolError::Decode` if the payload is not a valid message body
    pub fn read_payload(opcode: Opcode, format: WireFormat, bytes: &[u8]) -> Result<Self> {
        if bytes.len() > FrameHeader::MAX_PAYLOAD_SIZE as usize {
            return Err(ProtocolError::PayloadTooLarge {
                size: bytes.len(),
                max: FrameHeader::MAX_PAYLOAD_SIZE as usize,
            });
        }

        let message = match opcode {
            Opcode::Join => Self::Join(format.read(bytes)?),
            Opcode::Set => Self::Set(format.read(bytes)?),
            Opcode::Output => Self::Output(format.read(bytes)?),
            Opcode::Input => Self::Input(format.read(bytes)?),
            Opcode::Switch => Self::Switch(format.read(bytes)?),
            Opcode::Error => Self::Error(format.read(bytes)?),
        };

        Ok(message)
    }

    /// Convert into a transport frame in the given format.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Encode` / `UnsupportedFormat` from serialization
    /// - `ProtocolError::PayloadTooLarge` if the payload exceeds the limit
    pub fn into_frame(self, format: WireFormat) -> Result<Frame> {
        let mut buf = Vec::new();
        self.write_payload(format, &mut buf)?;
        Frame::new(FrameHeader::new(self.opcode(), format), buf)
    }

    /// Parse the message carried by a transport frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnknownOpcode` if the header opcode is unrecognized
    /// - `ProtocolError::UnsupportedFormat` if the header format is unknown or
    ///   not compiled in
    /// - `ProtocolError::Decode` if the payload is malformed
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        let opcode = frame
            .header
            .opcode_enum()
            .ok_or(ProtocolError::UnknownOpcode(frame.header.opcode()))?;

        let format = frame
            .header
            .format_enum()
            .filter(|format| format.is_available())
            .ok_or(ProtocolError::UnsupportedFormat(frame.header.format()))?;

        Self::read_payload(opcode, format, &frame.payload)
    }

    /// Encode a complete frame (header plus payload).
    ///
    /// # Errors
    ///
    /// See [`Message::into_frame`].
    pub fn encode(&self, format: WireFormat) -> Result<Bytes> {
        Ok(self.clone().into_frame(format)?.to_bytes())
    }

    /// Decode one complete frame.
    ///
    /// # Errors
    ///
    /// See [`Frame::decode`] and [`Message::from_frame`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Self::from_frame(&Frame::decode(bytes)?)
    }
}

impl From<Join> for Message {
    fn from(inner: Join) -> Self {
        Self::Join(inner)
    }
}

impl From<Settings> for Message {
    fn from(inner: Settings) -> Self {
        Self::Set(inner)
    }
}

impl From<Output> for Message {
    fn from(inner: Output) -> Self {
        Self::Output(inner)
    }
}

impl From<Input> for Message {
    fn from(inner: Input) -> Self {
        Self::Input(inner)
    }
}

impl From<Switch> for Message {
    fn from(inner: Switch) -> Self {
        Self::Switch(inner)
    }
}

impl From<ErrorPayload> for Message {
    fn from(inner: ErrorPayload) -> Self {
        Self::Error(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    #[test]
    fn opcode_matches_variant() {
        let cases: Vec<(Message, Opcode)> = vec![
            (Join::default().into(), Opcode::Join),
            (Settings::default().into(), Opcode::Set),
            (Input::default().into(), Opcode::Input),
            (Switch::new("b").into(), Opcode::Switch),
            (ErrorPayload::application("x").into(), Opcode::Error),
        ];
        for (message, opcode) in cases {
            assert_eq!(message.opcode(), opcode);
            let frame = message.into_frame(WireFormat::Json).expect("encode");
            assert_eq!(frame.header.opcode_enum(), Some(opcode));
        }
    }

    #[test]
    fn decoder_follows_header_format() {
        let message = Message::Input(Input::from_values([Value::from("Ann")]));
        for format in [WireFormat::Json, WireFormat::preferred()] {
            let wire = message.encode(format).expect("encode");
            assert_eq!(Message::decode(&wire).expect("decode"), message);
        }
    }

    #[test]
    fn unknown_opcode_is_rejected() {
        let mut wire = Message::Join(Join::default()).encode(WireFormat::Json).expect("encode");
        let mut raw = wire.to_vec();
        raw[6] = 0x7f;
        wire = Bytes::from(raw);
        assert_eq!(Message::decode(&wire), Err(ProtocolError::UnknownOpcode(0x7f)));
    }

    #[test]
    fn unknown_format_is_rejected() {
        let wire = Message::Join(Join::default()).encode(WireFormat::Json).expect("encode");
        let mut raw = wire.to_vec();
        raw[5] = 0x09;
        assert_eq!(Message::decode(&raw), Err(ProtocolError::UnsupportedFormat(0x09)));
    }

    #[test]
    fn payload_for_wrong_opcode_fails_to_decode() {
        // An Input body cannot be read as an Error body.
        let message = Message::Input(Input::from_values([Value::Int(1)]));
        let mut raw = message.encode(WireFormat::Json).expect("encode").to_vec();
        raw[6] = Opcode::Error.to_u8();
        assert!(matches!(Message::decode(&raw), Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn empty_payload_is_malformed() {
        let frame = Frame::new(FrameHeader::new(Opcode::Output, WireFormat::Json), Bytes::new())
            .expect("empty payload");
        assert!(matches!(Message::from_frame(&frame), Err(ProtocolError::Decode(_))));
    }
}
