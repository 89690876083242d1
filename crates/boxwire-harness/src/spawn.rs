//! Start a session on one end of a duplex pair and hand back the renderer.

use std::{sync::Arc, thread};

use boxwire_core::{
    App, SessionConfig, SessionError, blocking::Delegate, cooperative::AsyncDelegate, duplex,
};
use tokio::task::JoinHandle;

use crate::renderer::Renderer;

/// Run a cooperative session as a tokio task.
///
/// Must be called from inside a tokio runtime.
pub fn cooperative(
    app: Arc<App<dyn AsyncDelegate>>,
    config: SessionConfig,
) -> (JoinHandle<Result<(), SessionError>>, Renderer) {
    let (mut server, client) = duplex::pair();
    let format = config.format;
    let handle = tokio::spawn(async move {
        boxwire_core::cooperative::serve(app, &mut server, config).await
    });
    (handle, Renderer::new(client).with_format(format))
}

/// Run a blocking session on its own thread.
pub fn blocking(
    app: Arc<App<dyn Delegate>>,
    config: SessionConfig,
) -> (thread::JoinHandle<Result<(), SessionError>>, Renderer) {
    let (mut server, client) = duplex::pair();
    let format = config.format;
    let handle =
        thread::spawn(move || boxwire_core::blocking::serve(app, &mut server, config));
    (handle, Renderer::new(client).with_format(format))
}
