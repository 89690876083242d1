//! Boxwire server binary.
//!
//! Serves the bundled demo app over plain TCP.
//!
//! # Usage
//!
//! ```bash
//! # Cooperative sessions, CBOR payloads
//! boxwire-server --bind 127.0.0.1:8765
//!
//! # One OS thread per session, JSON payloads, idle sessions closed after 5 minutes
//! boxwire-server --blocking --format json --read-timeout-secs 300
//! ```

use std::time::Duration;

use boxwire_core::SessionConfig;
use boxwire_proto::WireFormat;
use boxwire_server::{Application, Server, ServerRuntimeConfig, demo};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Boxwire session server
#[derive(Parser, Debug)]
#[command(name = "boxwire-server")]
#[command(about = "Server-driven UI sessions over TCP")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "127.0.0.1:8765")]
    bind: String,

    /// Payload format for outbound messages (cbor, json)
    #[arg(short, long)]
    format: Option<WireFormat>,

    /// Close a session after this many seconds without a client message
    #[arg(long)]
    read_timeout_secs: Option<u64>,

    /// Error reports tolerated in a row before a session is dropped
    #[arg(long, default_value = "8")]
    max_errors: u32,

    /// Run every session on its own OS thread with blocking delegates
    #[arg(long)]
    blocking: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let format = args.format.unwrap_or_else(WireFormat::preferred);
    if !format.is_available() {
        return Err(format!("wire format {format:?} is not compiled into this build").into());
    }

    let config = ServerRuntimeConfig {
        bind_address: args.bind,
        session: SessionConfig {
            format,
            read_timeout: args.read_timeout_secs.map(Duration::from_secs),
            max_consecutive_errors: args.max_errors,
        },
    };

    let application = if args.blocking {
        Application::Blocking(demo::blocking()?)
    } else {
        Application::Cooperative(demo::cooperative()?)
    };

    tracing::info!(blocking = args.blocking, ?format, "Boxwire server starting");

    let server = Server::bind(config, application).await?;

    tracing::info!("Server listening on {}", server.local_addr()?);

    server.run().await?;

    Ok(())
}
