//! Blocking (thread-per-session) driver.
//!
//! [`serve`] runs one session to completion on the calling thread. Delegates
//! are plain functions taking a [`Ui`] handle; every render call blocks in
//! `Transport::recv` until the renderer replies.

use std::{collections::BTreeMap, collections::VecDeque, convert::Infallible, sync::Arc};

use boxwire_proto::{Node, Value, payloads::Settings};
use tracing::debug;

use crate::{
    app::App,
    context::Context,
    error::{SessionError, UiError},
    registry::Route,
    reply::Reply,
    session::{Session, SessionAction, SessionConfig},
    transport::Transport,
    view::View,
};

/// A view function for the blocking discipline.
///
/// Implemented for every `Fn(&mut Ui<'_>) -> Result<(), UiError>`.
pub trait Delegate: Send + Sync {
    /// Run from the top. Return `Err(UiError::Switch(..))` (usually via `?`)
    /// to hand over to another delegate.
    ///
    /// # Errors
    ///
    /// Any [`UiError`]; see the session engine for how each is handled.
    fn run(&self, ui: &mut Ui<'_>) -> Result<(), UiError>;
}

impl<F> Delegate for F
where
    F: Fn(&mut Ui<'_>) -> Result<(), UiError> + Send + Sync,
{
    fn run(&self, ui: &mut Ui<'_>) -> Result<(), UiError> {
        self(ui)
    }
}

/// Declare a blocking route from a closure or function.
pub fn route<F>(key: impl Into<String>, delegate: F) -> Route<dyn Delegate>
where
    F: Fn(&mut Ui<'_>) -> Result<(), UiError> + Send + Sync + 'static,
{
    let delegate: Arc<dyn Delegate> = Arc::new(delegate);
    Route::to(key, delegate)
}

/// Session handle passed to a running delegate.
pub struct Ui<'a> {
    session: &'a mut Session<dyn Delegate>,
    transport: &'a mut dyn Transport,
}

impl Ui<'_> {
    /// Send a render request and, unless it opted out, wait for the reply.
    ///
    /// # Errors
    ///
    /// - `UiError::Switch` if the renderer requested a context switch
    /// - `UiError::Closed` on end-of-stream
    /// - any other [`UiError`] for invalid requests or replies
    pub fn render(&mut self, view: impl Into<View>) -> Result<Reply, UiError> {
        let (bytes, read) = self.session.prepare_output(view.into())?;
        self.transport.send(bytes)?;
        if !read {
            return Ok(Reply::None);
        }

        let inbound = self.transport.recv()?;
        self.session.accept_reply(inbound)
    }

    /// Render a single node and wait for the reply.
    ///
    /// # Errors
    ///
    /// See [`Ui::render`].
    pub fn show(&mut self, node: Node) -> Result<Reply, UiError> {
        self.render(View::new(node))
    }

    /// Switch to the delegate registered under `target`.
    ///
    /// Sends `Switch`, waits for the renderer's ack and then returns
    /// `Err(UiError::Switch(..))`; propagate it with `?`. The current
    /// delegate's locals are gone after that; only the context survives.
    ///
    /// # Errors
    ///
    /// - `UiError::Switch` once acknowledged (the normal outcome)
    /// - `UiError::Route` if `target` is not registered (nothing is sent)
    /// - `UiError::SwitchInFlight` if another switch awaits its ack
    pub fn jump(
        &mut self,
        target: &str,
        params: BTreeMap<String, Value>,
    ) -> Result<Infallible, UiError> {
        let bytes = self.session.begin_jump(target, params)?;
        self.transport.send(bytes)?;

        loop {
            let inbound = self.transport.recv()?;
            if let Some(jump) = self.session.accept_jump_ack(inbound)? {
                return Err(UiError::Switch(jump));
            }
        }
    }

    /// Push a settings update without waiting for anything.
    ///
    /// # Errors
    ///
    /// - `UiError::Closed` / `UiError::Encode` / `UiError::Transport`
    pub fn push_settings(&mut self, settings: Settings) -> Result<(), UiError> {
        let bytes = self.session.prepare_settings(settings)?;
        self.transport.send(bytes)?;
        Ok(())
    }

    /// Session context bag.
    #[must_use]
    pub fn context(&self) -> &Context {
        self.session.context()
    }

    /// Mutable session context bag.
    pub fn context_mut(&mut self) -> &mut Context {
        self.session.context_mut()
    }

    /// Parameters passed by the switch that started this delegate.
    #[must_use]
    pub fn params(&self) -> &BTreeMap<String, Value> {
        self.session.params()
    }

    /// Resolved locale tag.
    #[must_use]
    pub fn locale(&self) -> Option<&str> {
        self.session.locale()
    }

    /// Translate `key` with the session locale, falling back to `key`.
    #[must_use]
    pub fn tr<'k>(&'k self, key: &'k str) -> &'k str {
        self.session.app().translate(self.session.locale(), key).unwrap_or(key)
    }
}

/// Run one session to completion.
///
/// Returns `Ok(())` when the renderer closes the stream.
///
/// # Errors
///
/// - `SessionError::Transport` if the transport fails
/// - `SessionError::Remote` if the renderer reports an error
/// - `SessionError::TooManyErrors` if the error budget is exhausted
pub fn serve(
    app: Arc<App<dyn Delegate>>,
    transport: &mut dyn Transport,
    config: SessionConfig,
) -> Result<(), SessionError> {
    let mut session = Session::new(app, config);
    let mut pending = VecDeque::new();

    loop {
        let Some(action) = pending.pop_front() else {
            let inbound = transport.recv()?;
            pending.extend(session.handle_inbound(inbound));
            continue;
        };

        match action {
            SessionAction::Send(bytes) => transport.send(bytes)?,
            SessionAction::Dispatch(delegate) => {
                debug!(route = ?session.route(), "dispatch");
                let result = delegate.run(&mut Ui { session: &mut session, transport: &mut *transport });
                pending.extend(session.finish_dispatch(result));
            },
            SessionAction::Close => return Ok(()),
            SessionAction::Fail(err) => return Err(err),
        }
    }
}
