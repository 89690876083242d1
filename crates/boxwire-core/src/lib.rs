//! Session engine for boxwire.
//!
//! A boxwire server drives a remote renderer through a sequence of render
//! requests. Application code lives in *delegates*: ordinary functions that
//! call [`blocking::Ui::render`] (or its async twin) and get the user's input
//! back as a return value. The engine owns everything else: the handshake,
//! reply decoding, context switches between delegates, error reporting.
//!
//! # Architecture
//!
//! - [`session::Session`] is a pure state machine. It takes inbound bytes and
//!   returns [`session::SessionAction`]s or call results; it performs no I/O.
//! - [`blocking`] and [`cooperative`] are the two drivers. Each pairs the
//!   state machine with a transport and runs delegates; they differ only in
//!   how they wait.
//! - [`app::App`] and [`registry::Registry`] hold the immutable,
//!   process-wide part: routes, settings, locale tables.
//! - [`duplex`] is an in-process transport pair for tests and embedding.
//!
//! # Context switches
//!
//! A switch abandons the running delegate. Its outcome is the error value
//! [`UiError::Switch`], so `?` unwinds the delegate's stack and the driver
//! dispatches the target from its top. Only the session [`Context`] and the
//! switch parameters carry across.
#![forbid(unsafe_code)]

pub mod app;
pub mod blocking;
pub mod context;
pub mod cooperative;
pub mod duplex;
pub mod error;
pub mod registry;
pub mod reply;
pub mod session;
pub mod transport;
pub mod view;

pub use app::{App, AppBuilder};
pub use context::Context;
pub use error::{Jump, SessionError, TransportError, UiError};
pub use registry::{Registry, RegistryError, Route};
pub use reply::Reply;
pub use session::{Session, SessionAction, SessionConfig, SessionState};
pub use transport::{AsyncTransport, Transport};
pub use view::View;
