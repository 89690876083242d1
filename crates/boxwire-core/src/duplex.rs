//! In-process duplex bridge.
//!
//! Two queue ends wired back to back: what one end sends, the other receives,
//! in FIFO order. Used to drive a session without a socket. Each end speaks
//! both the blocking and the cooperative transport trait.
//!
//! End-of-stream is an explicit sentinel (`None` on the queue) sent by
//! [`DuplexEnd::close`]. Dropping an end reads the same way on the other side.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::{
    error::TransportError,
    transport::{AsyncTransport, Transport},
};

/// One end of an in-process duplex channel.
#[derive(Debug)]
pub struct DuplexEnd {
    tx: mpsc::UnboundedSender<Option<Bytes>>,
    rx: mpsc::UnboundedReceiver<Option<Bytes>>,
    eof: bool,
}

/// Create two connected ends.
#[must_use]
pub fn pair() -> (DuplexEnd, DuplexEnd) {
    let (a_tx, b_rx) = mpsc::unbounded_channel();
    let (b_tx, a_rx) = mpsc::unbounded_channel();
    (
        DuplexEnd { tx: a_tx, rx: a_rx, eof: false },
        DuplexEnd { tx: b_tx, rx: b_rx, eof: false },
    )
}

impl DuplexEnd {
    /// Enqueue a message for the peer. Never blocks.
    ///
    /// # Errors
    ///
    /// - `TransportError::Disconnected` if the peer end was dropped
    pub fn push(&self, message: Bytes) -> Result<(), TransportError> {
        self.tx.send(Some(message)).map_err(|_| TransportError::Disconnected)
    }

    /// Signal end-of-stream to the peer.
    ///
    /// Closing towards a dropped peer is not an error.
    pub fn close(&self) {
        let _ = self.tx.send(None);
    }

    /// Wait for the next message. `None` once end-of-stream was seen.
    pub async fn pop(&mut self) -> Option<Bytes> {
        if self.eof {
            return None;
        }
        let next = self.rx.recv().await.flatten();
        self.eof = next.is_none();
        next
    }

    /// Blocking variant of [`DuplexEnd::pop`].
    ///
    /// # Panics
    ///
    /// Panics if called from inside an async runtime.
    pub fn pop_blocking(&mut self) -> Option<Bytes> {
        if self.eof {
            return None;
        }
        let next = self.rx.blocking_recv().flatten();
        self.eof = next.is_none();
        next
    }

    /// Take a message that is already queued, without waiting.
    pub fn try_pop(&mut self) -> Option<Bytes> {
        if self.eof {
            return None;
        }
        match self.rx.try_recv() {
            Ok(Some(message)) => Some(message),
            Ok(None) | Err(mpsc::error::TryRecvError::Disconnected) => {
                self.eof = true;
                None
            },
            Err(mpsc::error::TryRecvError::Empty) => None,
        }
    }

    /// Whether end-of-stream was observed.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.eof
    }
}

impl Transport for DuplexEnd {
    fn send(&mut self, message: Bytes) -> Result<(), TransportError> {
        self.push(message)
    }

    fn recv(&mut self) -> Result<Option<Bytes>, TransportError> {
        Ok(self.pop_blocking())
    }
}

#[async_trait]
impl AsyncTransport for DuplexEnd {
    async fn send(&mut self, message: Bytes) -> Result<(), TransportError> {
        self.push(message)
    }

    async fn recv(&mut self) -> Result<Option<Bytes>, TransportError> {
        Ok(self.pop().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn preserves_fifo_order() {
        let (a, mut b) = pair();
        for i in 0..5u8 {
            a.push(Bytes::from(vec![i])).expect("peer alive");
        }
        for i in 0..5u8 {
            assert_eq!(b.pop().await, Some(Bytes::from(vec![i])));
        }
    }

    #[tokio::test]
    async fn sentinel_is_end_of_stream() {
        let (a, mut b) = pair();
        a.push(Bytes::from_static(b"last")).expect("peer alive");
        a.close();
        a.push(Bytes::from_static(b"after close")).expect("peer alive");

        assert_eq!(b.pop().await, Some(Bytes::from_static(b"last")));
        assert_eq!(b.pop().await, None);
        assert!(b.is_eof());
        assert_eq!(b.pop().await, None);
    }

    #[tokio::test]
    async fn dropped_peer_is_end_of_stream() {
        let (a, mut b) = pair();
        drop(a);
        assert_eq!(AsyncTransport::recv(&mut b).await, Ok(None));
        assert_eq!(b.push(Bytes::new()), Err(TransportError::Disconnected));
    }

    #[test]
    fn blocking_ends_work_across_threads() {
        let (mut a, mut b) = pair();
        let echo = std::thread::spawn(move || {
            while let Ok(Some(message)) = Transport::recv(&mut b) {
                Transport::send(&mut b, message).expect("peer alive");
            }
        });

        Transport::send(&mut a, Bytes::from_static(b"ping")).expect("peer alive");
        assert_eq!(Transport::recv(&mut a), Ok(Some(Bytes::from_static(b"ping"))));
        a.close();
        echo.join().expect("echo thread");
    }

    #[test]
    fn try_pop_does_not_wait() {
        let (a, mut b) = pair();
        assert_eq!(b.try_pop(), None);
        assert!(!b.is_eof());
        a.push(Bytes::from_static(b"x")).expect("peer alive");
        assert_eq!(b.try_pop(), Some(Bytes::from_static(b"x")));
    }
}
