//! Byte channel abstractions.
//!
//! The engine needs exactly two operations: send one encoded message, and
//! receive one encoded message or end-of-stream (`Ok(None)`). Framing, sockets
//! and buffering live behind these traits.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransportError;

/// Blocking transport for the thread-per-session discipline.
pub trait Transport {
    /// Send one encoded message.
    ///
    /// # Errors
    ///
    /// `TransportError` if the peer cannot receive it.
    fn send(&mut self, message: Bytes) -> Result<(), TransportError>;

    /// Receive one encoded message, blocking until one arrives.
    ///
    /// `Ok(None)` is end-of-stream: the session closes normally.
    ///
    /// # Errors
    ///
    /// `TransportError` if the channel failed (not for end-of-stream).
    fn recv(&mut self) -> Result<Option<Bytes>, TransportError>;
}

/// Asynchronous transport for the cooperative discipline.
///
/// `send` and `recv` are the only suspension points of a cooperative session.
#[async_trait]
pub trait AsyncTransport: Send {
    /// Send one encoded message.
    ///
    /// # Errors
    ///
    /// `TransportError` if the peer cannot receive it.
    async fn send(&mut self, message: Bytes) -> Result<(), TransportError>;

    /// Receive one encoded message. `Ok(None)` is end-of-stream.
    ///
    /// # Errors
    ///
    /// `TransportError` if the channel failed (not for end-of-stream).
    async fn recv(&mut self) -> Result<Option<Bytes>, TransportError>;
}
