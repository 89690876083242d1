//! Error types for the session engine.
//!
//! Three layers, three types:
//!
//! - [`TransportError`]: the byte channel failed (never end-of-stream, which is
//!   a normal `None` from `recv`).
//! - [`UiError`]: what a render, jump or settings call returns to delegate
//!   code. It also carries the two control-flow outcomes, [`UiError::Switch`]
//!   and [`UiError::Closed`], so a delegate unwinds with `?` and the dispatch
//!   loop decides what happens next.
//! - [`SessionError`]: why a whole session ended abnormally.

use std::collections::BTreeMap;

use boxwire_proto::{
    EditError, Opcode, ProtocolError, Value, payloads::ErrorPayload, view::DuplicateName,
};
use thiserror::Error;

use crate::registry::RegistryError;

/// Byte channel failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Peer is gone and cannot receive
    #[error("peer disconnected")]
    Disconnected,

    /// Stream carried bytes that do not delimit into frames
    #[error("framing error: {0}")]
    Framing(#[from] ProtocolError),

    /// Underlying I/O failure
    #[error("i/o error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// A resolved context switch: the target route and what to hand it.
#[derive(Debug, Clone, PartialEq)]
pub struct Jump {
    /// Route key of the delegate to run next
    pub target: String,
    /// Parameters exposed to the target as `params()`
    pub params: BTreeMap<String, Value>,
}

/// Outcome of a delegate-facing call that did not produce a value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UiError {
    /// Control flow: abandon this delegate and run another one
    #[error("switching to {}", .0.target)]
    Switch(Jump),

    /// Control flow: the renderer went away
    #[error("session closed")]
    Closed,

    /// The renderer reported a failure
    #[error("remote error {code}: {text}")]
    Remote {
        /// Error code sent by the renderer
        code: u16,
        /// Error text sent by the renderer
        text: String,
    },

    /// Inbound bytes were not a valid message
    #[error("malformed message: {0}")]
    Decode(ProtocolError),

    /// Outbound message could not be encoded
    #[error("failed to encode message: {0}")]
    Encode(ProtocolError),

    /// Valid message of the wrong type for the current state
    #[error("unexpected message: expected {expected}, got {got}")]
    Unexpected {
        /// Message type(s) valid in this state
        expected: &'static str,
        /// Message type received
        got: Opcode,
    },

    /// Switch target is not a registered route
    #[error(transparent)]
    Route(#[from] RegistryError),

    /// Render request carried an invalid edit
    #[error("invalid edit: {0}")]
    Edit(#[from] EditError),

    /// Render request carried sibling nodes with the same name
    #[error("invalid widget tree: {0}")]
    Tree(#[from] DuplicateName),

    /// A jump was requested while another awaited its ack
    #[error("switch to {0} still awaiting acknowledgement")]
    SwitchInFlight(String),

    /// Transport failed mid-call
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Application-level failure raised by delegate code
    #[error("{0}")]
    Application(String),
}

impl UiError {
    /// Application failure with a message.
    pub fn application(text: impl Into<String>) -> Self {
        Self::Application(text.into())
    }

    /// Error envelope reported to the renderer for recoverable errors.
    ///
    /// `None` for control flow and fatal errors, which are never reported.
    #[must_use]
    pub fn to_payload(&self) -> Option<ErrorPayload> {
        let payload = match self {
            Self::Switch(_) | Self::Closed | Self::Remote { .. } | Self::Transport(_) => {
                return None;
            },
            Self::Decode(err) => ErrorPayload::malformed(err.to_string()),
            Self::Unexpected { expected, got } => ErrorPayload::unexpected(expected, got.name()),
            Self::Route(RegistryError::NotFound(token)) => ErrorPayload::route_not_found(token),
            Self::Route(err) => ErrorPayload::application(err.to_string()),
            Self::Edit(err) => ErrorPayload::invalid_edit(err.to_string()),
            Self::Tree(err) => ErrorPayload::invalid_edit(err.to_string()),
            Self::SwitchInFlight(pending) => ErrorPayload::switch_in_flight(pending),
            Self::Encode(err) => ErrorPayload::application(err.to_string()),
            Self::Application(text) => ErrorPayload::application(text.clone()),
        };
        Some(payload)
    }
}

/// Why a session ended abnormally.
///
/// End-of-stream is not here: a closed connection ends `serve` with `Ok(())`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Renderer reported an error; not retried
    #[error("remote error {code}: {text}")]
    Remote {
        /// Error code sent by the renderer
        code: u16,
        /// Error text sent by the renderer
        text: String,
    },

    /// Transport failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Too many error reports without a successful read
    #[error("giving up after {count} consecutive errors")]
    TooManyErrors {
        /// Errors reported in a row
        count: u32,
    },

    /// Engine could not encode its own messages
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}
