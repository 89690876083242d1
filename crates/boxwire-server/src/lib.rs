//! Boxwire TCP server.
//!
//! Production glue around [`boxwire_core`]: accepts TCP connections and runs
//! one session per connection. The session engine itself performs no I/O;
//! this crate supplies the transports and picks the execution discipline.
//!
//! # Components
//!
//! - [`Server`]: accept loop, one session per connection
//! - [`Application`]: the app to serve, cooperative or blocking
//! - [`TcpTransport`]: tokio stream transport (cooperative sessions)
//! - [`StreamTransport`]: std stream transport (thread-per-session)
//! - [`demo`]: the sample app shipped with the binary

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod demo;
mod error;
mod transport;

use std::{net::SocketAddr, sync::Arc, thread};

use boxwire_core::{
    App, SessionConfig, SessionError,
    blocking::{self, Delegate},
    cooperative::{self, AsyncDelegate},
};
pub use error::ServerError;
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};
pub use transport::{StreamTransport, TcpTransport};

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "127.0.0.1:8765")
    pub bind_address: String,
    /// Per-session engine configuration
    pub session: SessionConfig,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self { bind_address: "127.0.0.1:8765".to_string(), session: SessionConfig::default() }
    }
}

/// The application a server runs, tagged with its execution discipline.
#[derive(Debug, Clone)]
pub enum Application {
    /// Async delegates; every session is a tokio task
    Cooperative(Arc<App<dyn AsyncDelegate>>),
    /// Blocking delegates; every session gets its own OS thread
    Blocking(Arc<App<dyn Delegate>>),
}

/// Production boxwire server.
pub struct Server {
    listener: TcpListener,
    application: Application,
    session: SessionConfig,
}

impl Server {
    /// Bind the listening socket.
    pub async fn bind(
        config: ServerRuntimeConfig,
        application: Application,
    ) -> Result<Self, ServerError> {
        let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
            ServerError::Config(format!("invalid bind address '{}': {e}", config.bind_address))
        })?;
        let listener = TcpListener::bind(addr).await?;

        Ok(Self { listener, application, session: config.session })
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever.
    ///
    /// A failed accept is logged and skipped; a failed session never stops
    /// the server.
    pub async fn run(self) -> Result<(), ServerError> {
        info!(addr = %self.local_addr()?, "server starting");

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => self.spawn_session(stream, peer),
                Err(e) => error!(error = %e, "accept failed"),
            }
        }
    }

    fn spawn_session(&self, stream: TcpStream, peer: SocketAddr) {
        info!(%peer, "session opened");
        let config = self.session.clone();

        match &self.application {
            Application::Cooperative(app) => {
                let app = Arc::clone(app);
                tokio::spawn(async move {
                    let mut transport = TcpTransport::new(stream);
                    log_outcome(peer, cooperative::serve(app, &mut transport, config).await);
                });
            },
            Application::Blocking(app) => {
                let app = Arc::clone(app);
                let stream = match stream.into_std() {
                    Ok(stream) => stream,
                    Err(e) => {
                        warn!(%peer, error = %e, "cannot hand connection to a thread");
                        return;
                    },
                };

                let spawned = thread::Builder::new().name(format!("session-{peer}")).spawn(move || {
                    let mut transport = match StreamTransport::tcp(stream, config.read_timeout) {
                        Ok(transport) => transport,
                        Err(e) => {
                            warn!(%peer, error = %e, "cannot configure connection");
                            return;
                        },
                    };
                    log_outcome(peer, blocking::serve(app, &mut transport, config));
                });
                if let Err(e) = spawned {
                    error!(%peer, error = %e, "cannot spawn session thread");
                }
            },
        }
    }
}

fn log_outcome(peer: SocketAddr, outcome: Result<(), SessionError>) {
    match outcome {
        Ok(()) => info!(%peer, "session closed"),
        Err(err) => error!(%peer, %err, "session failed"),
    }
}
