//! Cooperative (async) driver.
//!
//! Same protocol decisions as the blocking driver, but delegates are async
//! and every wait is an `.await`, so one runtime thread can serve many
//! sessions. The per-message read timeout from [`SessionConfig`] is enforced
//! here; an elapsed timeout is treated as end-of-stream.

use std::{
    collections::{BTreeMap, VecDeque},
    convert::Infallible,
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use boxwire_proto::{Node, Value, payloads::Settings};
use bytes::Bytes;
use tracing::{debug, warn};

use crate::{
    app::App,
    context::Context,
    error::{SessionError, TransportError, UiError},
    registry::Route,
    reply::Reply,
    session::{Session, SessionAction, SessionConfig},
    transport::AsyncTransport,
    view::View,
};

/// A view function for the cooperative discipline.
#[async_trait]
pub trait AsyncDelegate: Send + Sync {
    /// Run from the top. Return `Err(UiError::Switch(..))` (usually via `?`)
    /// to hand over to another delegate.
    ///
    /// # Errors
    ///
    /// Any [`UiError`].
    async fn run(&self, ui: &mut AsyncUi<'_>) -> Result<(), UiError>;
}

/// Declare a cooperative route.
pub fn route(
    key: impl Into<String>,
    delegate: impl AsyncDelegate + 'static,
) -> Route<dyn AsyncDelegate> {
    let delegate: Arc<dyn AsyncDelegate> = Arc::new(delegate);
    Route::to(key, delegate)
}

/// Session handle passed to a running async delegate.
pub struct AsyncUi<'a> {
    session: &'a mut Session<dyn AsyncDelegate>,
    transport: &'a mut dyn AsyncTransport,
}

impl AsyncUi<'_> {
    /// Send a render request and, unless it opted out, wait for the reply.
    ///
    /// # Errors
    ///
    /// - `UiError::Switch` if the renderer requested a context switch
    /// - `UiError::Closed` on end-of-stream or read timeout
    /// - any other [`UiError`] for invalid requests or replies
    pub async fn render(&mut self, view: impl Into<View>) -> Result<Reply, UiError> {
        let (bytes, read) = self.session.prepare_output(view.into())?;
        self.transport.send(bytes).await?;
        if !read {
            return Ok(Reply::None);
        }

        let inbound = self.recv().await?;
        self.session.accept_reply(inbound)
    }

    /// Render a single node and wait for the reply.
    ///
    /// # Errors
    ///
    /// See [`AsyncUi::render`].
    pub async fn show(&mut self, node: Node) -> Result<Reply, UiError> {
        self.render(View::new(node)).await
    }

    /// Switch to the delegate registered under `target`.
    ///
    /// # Errors
    ///
    /// - `UiError::Switch` once acknowledged (the normal outcome)
    /// - `UiError::Route` if `target` is not registered (nothing is sent)
    /// - `UiError::SwitchInFlight` if another switch awaits its ack
    pub async fn jump(
        &mut self,
        target: &str,
        params: BTreeMap<String, Value>,
    ) -> Result<Infallible, UiError> {
        let bytes = self.session.begin_jump(target, params)?;
        self.transport.send(bytes).await?;

        loop {
            let inbound = self.recv().await?;
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
    pub async fn push_settings(&mut self, settings: Settings) -> Result<(), UiError> {
        let bytes = self.session.prepare_settings(settings)?;
        self.transport.send(bytes).await?;
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

    async fn recv(&mut self) -> Result<Option<Bytes>, TransportError> {
        recv_within(&mut *self.transport, self.session.config().read_timeout).await
    }
}

async fn recv_within(
    transport: &mut dyn AsyncTransport,
    limit: Option<Duration>,
) -> Result<Option<Bytes>, TransportError> {
    let Some(limit) = limit else {
        return transport.recv().await;
    };

    match tokio::time::timeout(limit, transport.recv()).await {
        Ok(result) => result,
        Err(_) => {
            warn!(?limit, "read timed out, closing session");
            Ok(None)
        },
    }
}

/// Run one session to completion.
///
/// Returns `Ok(())` when the renderer closes the stream or a read times out.
///
/// # Errors
///
/// - `SessionError::Transport` if the transport fails
/// - `SessionError::Remote` if the renderer reports an error
/// - `SessionError::TooManyErrors` if the error budget is exhausted
pub async fn serve(
    app: Arc<App<dyn AsyncDelegate>>,
    transport: &mut dyn AsyncTransport,
    config: SessionConfig,
) -> Result<(), SessionError> {
    let limit = config.read_timeout;
    let mut session = Session::new(app, config);
    let mut pending = VecDeque::new();

    loop {
        let Some(action) = pending.pop_front() else {
            let inbound = recv_within(&mut *transport, limit).await?;
            pending.extend(session.handle_inbound(inbound));
            continue;
        };

        match action {
            SessionAction::Send(bytes) => transport.send(bytes).await?,
            SessionAction::Dispatch(delegate) => {
                debug!(route = ?session.route(), "dispatch");
                let mut ui = AsyncUi { session: &mut session, transport: &mut *transport };
                let result = delegate.run(&mut ui).await;
                pending.extend(session.finish_dispatch(result));
            },
            SessionAction::Close => return Ok(()),
            SessionAction::Fail(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use boxwire_proto::{
        Message, WireFormat,
        payloads::{ErrorPayload, Input, Join, Switch},
    };

    use super::*;
    use crate::duplex::{self, DuplexEnd};

    struct Ask;

    #[async_trait]
    impl AsyncDelegate for Ask {
        async fn run(&self, ui: &mut AsyncUi<'_>) -> Result<(), UiError> {
            let reply = ui.show(Node::text("Name?").value("")).await?;
            ui.context_mut().insert("name", reply.value().cloned().unwrap_or_default());
            ui.jump("greet", BTreeMap::new()).await?;
            Ok(())
        }
    }

    struct Greet;

    #[async_trait]
    impl AsyncDelegate for Greet {
        async fn run(&self, ui: &mut AsyncUi<'_>) -> Result<(), UiError> {
            let name = ui.context().get("name").cloned().unwrap_or_else(|| Value::from("stranger"));
            let greeting = format!("{} {name}", ui.tr("hello"));
            ui.render(View::new(Node::text(greeting)).no_read()).await?;
            Ok(())
        }
    }

    fn app() -> Arc<App<dyn AsyncDelegate>> {
        App::builder(route("ask", Ask))
            .route(route("greet", Greet))
            .locale("en", [("hello", "Hello")])
            .default_locale("en")
            .build()
            .expect("valid app")
    }

    fn config() -> SessionConfig {
        SessionConfig { format: WireFormat::Json, ..SessionConfig::default() }
    }

    async fn next(client: &mut DuplexEnd) -> Message {
        Message::decode(&client.pop().await.expect("message")).expect("decode")
    }

    fn encode(message: impl Into<Message>) -> Bytes {
        message.into().encode(WireFormat::Json).expect("encode")
    }

    #[tokio::test]
    async fn context_survives_server_jump() {
        let (mut server, mut client) = duplex::pair();
        let app = app();
        let session = tokio::spawn(async move { serve(app, &mut server, config()).await });

        client.push(encode(Join::default().with_locale("en-GB"))).expect("push");
        assert!(matches!(next(&mut client).await, Message::Set(s) if s.locale.is_some()));
        assert!(matches!(next(&mut client).await, Message::Output(_)));
        client.push(encode(Input::from_values([Value::from("Ann")]))).expect("push");

        assert_eq!(next(&mut client).await, Message::Switch(Switch::new("greet")));
        client.push(encode(Switch::new("greet"))).expect("push");

        let greeting = next(&mut client).await;
        assert!(matches!(greeting, Message::Output(o) if o.root.text.as_deref() == Some("Hello Ann")));

        client.close();
        assert_eq!(session.await.expect("task"), Ok(()));
    }

    #[tokio::test]
    async fn client_switch_interrupts_render() {
        let (mut server, mut client) = duplex::pair();
        let app = app();
        let session = tokio::spawn(async move { serve(app, &mut server, config()).await });

        client.push(encode(Join::default())).expect("push");
        next(&mut client).await;
        next(&mut client).await;

        client.push(encode(Switch::new("greet"))).expect("push");
        let greeting = next(&mut client).await;
        assert!(matches!(greeting, Message::Output(o) if o.root.text.as_deref() == Some("Hello stranger")));

        client.close();
        assert_eq!(session.await.expect("task"), Ok(()));
    }

    #[tokio::test]
    async fn remote_error_fails_session() {
        let (mut server, mut client) = duplex::pair();
        let app = app();
        let session = tokio::spawn(async move { serve(app, &mut server, config()).await });

        client.push(encode(Join::default())).expect("push");
        next(&mut client).await;
        next(&mut client).await;
        client.push(encode(ErrorPayload::new(42, "renderer crashed"))).expect("push");

        assert_eq!(
            session.await.expect("task"),
            Err(SessionError::Remote { code: 42, text: "renderer crashed".into() })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn read_timeout_closes_quietly() {
        let (mut server, _client) = duplex::pair();
        let config = SessionConfig { read_timeout: Some(Duration::from_secs(5)), ..config() };
        assert_eq!(serve(app(), &mut server, config).await, Ok(()));
    }
}
