//! Stream transports.
//!
//! Sessions exchange whole frames; a byte stream carries them back to back.
//! Both transports delimit the stream the same way: read the fixed-size
//! header, validate it, then read exactly `payload_size` more bytes. A clean
//! end-of-file before the first header byte is end-of-stream; one in the
//! middle of a frame is an I/O error.

use std::{
    io::{self, ErrorKind, Read, Write},
    net::{SocketAddr, TcpStream as StdTcpStream},
    time::Duration,
};

use async_trait::async_trait;
use boxwire_core::{AsyncTransport, Transport, TransportError};
use boxwire_proto::FrameHeader;
use bytes::{Bytes, BytesMut};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};
use tracing::debug;

/// Cooperative transport over a tokio TCP stream.
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Wrap a connected stream.
    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }

    /// Peer address, for logging.
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.peer_addr()
    }
}

#[async_trait]
impl AsyncTransport for TcpTransport {
    async fn send(&mut self, message: Bytes) -> Result<(), TransportError> {
        self.stream.write_all(&message).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<Bytes>, TransportError> {
        let mut header = [0u8; FrameHeader::SIZE];
        let mut filled = 0;
        while filled < header.len() {
            match self.stream.read(&mut header[filled..]).await? {
                0 if filled == 0 => return Ok(None),
                0 => return Err(truncated()),
                n => filled += n,
            }
        }

        let mut frame = start_frame(&header)?;
        self.stream.read_exact(&mut frame[FrameHeader::SIZE..]).await?;
        Ok(Some(frame.freeze()))
    }
}

/// Blocking transport over any `Read + Write` stream.
///
/// A read timeout configured on the underlying socket surfaces as
/// end-of-stream when it fires between frames, so the session closes instead
/// of waiting forever.
#[derive(Debug)]
pub struct StreamTransport<S> {
    stream: S,
}

impl<S: Read + Write> StreamTransport<S> {
    /// Wrap a stream.
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Give the stream back.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl StreamTransport<StdTcpStream> {
    /// Wrap a TCP stream in blocking mode with an optional per-read timeout.
    pub fn tcp(stream: StdTcpStream, read_timeout: Option<Duration>) -> io::Result<Self> {
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(read_timeout)?;
        Ok(Self::new(stream))
    }
}

impl<S: Read + Write> Transport for StreamTransport<S> {
    fn send(&mut self, message: Bytes) -> Result<(), TransportError> {
        self.stream.write_all(&message)?;
        self.stream.flush()?;
        Ok(())
    }

    fn recv(&mut self) -> Result<Option<Bytes>, TransportError> {
        let mut header = [0u8; FrameHeader::SIZE];
        let mut filled = 0;
        while filled < header.len() {
            match self.stream.read(&mut header[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => return Err(truncated()),
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => {},
                Err(err) if filled == 0 && is_timeout(&err) => {
                    debug!("read timed out between frames");
                    return Ok(None);
                },
                Err(err) => return Err(err.into()),
            }
        }

        let mut frame = start_frame(&header)?;
        self.stream.read_exact(&mut frame[FrameHeader::SIZE..])?;
        Ok(Some(frame.freeze()))
    }
}

/// Validate `header` and allocate the whole frame, header bytes included.
fn start_frame(header: &[u8; FrameHeader::SIZE]) -> Result<BytesMut, TransportError> {
    let payload_size = FrameHeader::from_bytes(header)?.payload_size() as usize;
    let mut frame = BytesMut::zeroed(FrameHeader::SIZE + payload_size);
    frame[..FrameHeader::SIZE].copy_from_slice(header);
    Ok(frame)
}

fn truncated() -> TransportError {
    TransportError::Io("stream ended inside a frame header".to_string())
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}
