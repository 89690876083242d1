//! Test harness for boxwire sessions.
//!
//! A scripted [`Renderer`] plays the client over the in-process duplex bridge,
//! so whole sessions run without sockets. [`spawn`] starts the server side in
//! either discipline. The scenario tests under `tests/` are built on these two
//! pieces.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod renderer;
pub mod spawn;

pub use renderer::{HarnessError, RECV_TIMEOUT, Renderer};
