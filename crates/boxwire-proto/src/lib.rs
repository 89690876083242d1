//! Wire format for boxwire sessions.
//!
//! Every message is a frame: a fixed 12-byte header (zero-copy binary)
//! followed by a serialized payload. The header names the message type and the
//! payload format, so a transport can delimit frames on a byte stream and a
//! decoder never has to guess which serialization is in use.
//!
//! Payloads are compact CBOR maps when the `cbor` feature is enabled, with a
//! JSON fallback that is always compiled in. Both carry the same data model:
//! the [`Node`] widget tree, [`Choice`] entries, [`Edit`] descriptors and the
//! session envelopes in [`payloads`].
//!
//! # Invariants
//!
//! - Round-trip: decoding an encoded [`Message`] yields an equal value in every
//!   format.
//! - Absent fields are never emitted. A renderer sees "key missing", never
//!   "key = null".
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod edit;
pub mod errors;
pub mod format;
pub mod frame;
pub mod header;
pub mod opcodes;
pub mod payloads;
pub mod value;
pub mod view;

pub use edit::{Edit, EditError, EditKind, Locator, Position, Selector};
pub use errors::{ProtocolError, Result};
pub use format::WireFormat;
pub use frame::Frame;
pub use header::FrameHeader;
pub use opcodes::Opcode;
pub use payloads::Message;
pub use value::Value;
pub use view::{Choice, Item, Node, RESERVED_KEYS};
