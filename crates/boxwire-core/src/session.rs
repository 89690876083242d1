//! Session engine state machine.
//!
//! One [`Session`] per connection. It never touches a transport: drivers feed
//! it inbound bytes and get back either [`SessionAction`]s (between delegate
//! runs) or the result of a delegate-facing call (while a delegate runs). The
//! blocking and cooperative drivers share every protocol decision made here.
//!
//! # State Machine
//!
//! ```text
//! ┌─────────────┐  Join   ┌─────────────┐ render ┌───────────────┐
//! │ AwaitingJoin│────────>│ Dispatching │───────>│ AwaitingInput │
//! └─────────────┘         └─────────────┘<───────└───────────────┘
//!                           │   ↑    ↑     Input       │
//!                    return │   │    └──── Switch ─────┘
//!                           ↓   │ Switch
//!                         ┌──────┐
//!                         │ Idle │
//!                         └──────┘
//!        end-of-stream from any state ──> Closed
//! ```

use std::{collections::BTreeMap, fmt, sync::Arc, time::Duration};

use boxwire_proto::{
    Message, Opcode, ProtocolError, Value, WireFormat,
    payloads::{ErrorPayload, Join, Settings, Switch},
};
use bytes::Bytes;
use tracing::{debug, error, info, warn};

use crate::{
    app::App,
    context::Context,
    error::{Jump, SessionError, UiError},
    reply::Reply,
    view::View,
};

/// Default limit of error reports in a row before a session is dropped.
pub const DEFAULT_MAX_CONSECUTIVE_ERRORS: u32 = 8;

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Payload format for outbound messages
    pub format: WireFormat,
    /// Longest wait for one inbound message; elapsing closes the session
    pub read_timeout: Option<Duration>,
    /// Error reports tolerated in a row without a successful read
    pub max_consecutive_errors: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            format: WireFormat::preferred(),
            read_timeout: None,
            max_consecutive_errors: DEFAULT_MAX_CONSECUTIVE_ERRORS,
        }
    }
}

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the client's `Join`
    AwaitingJoin,
    /// A delegate is running
    Dispatching,
    /// A delegate is blocked on a render call
    AwaitingInput,
    /// The last delegate returned; waiting for a client `Switch`
    Idle,
    /// End-of-stream seen or session failed; nothing more is sent
    Closed,
}

/// Decisions returned to the driver between delegate runs.
pub enum SessionAction<D: ?Sized> {
    /// Send these bytes to the renderer
    Send(Bytes),
    /// Run this delegate from its top
    Dispatch(Arc<D>),
    /// Stop normally
    Close,
    /// Stop with an error
    Fail(SessionError),
}

impl<D: ?Sized> fmt::Debug for SessionAction<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Send(bytes) => f.debug_tuple("Send").field(&bytes.len()).finish(),
            Self::Dispatch(_) => f.write_str("Dispatch"),
            Self::Close => f.write_str("Close"),
            Self::Fail(err) => f.debug_tuple("Fail").field(err).finish(),
        }
    }
}

/// Per-connection session state machine.
///
/// Generic over the delegate type so both driver disciplines can share it.
pub struct Session<D: ?Sized> {
    app: Arc<App<D>>,
    config: SessionConfig,
    state: SessionState,
    context: Context,
    params: BTreeMap<String, Value>,
    route: Option<String>,
    delegate: Option<Arc<D>>,
    mode: Option<String>,
    locale: Option<String>,
    pending_switch: Option<Jump>,
    expected_inputs: usize,
    consecutive_errors: u32,
}

impl<D: ?Sized> Session<D> {
    /// Create a session in [`SessionState::AwaitingJoin`].
    pub fn new(app: Arc<App<D>>, config: SessionConfig) -> Self {
        Self {
            app,
            config,
            state: SessionState::AwaitingJoin,
            context: Context::new(),
            params: BTreeMap::new(),
            route: None,
            delegate: None,
            mode: None,
            locale: None,
            pending_switch: None,
            expected_inputs: 0,
            consecutive_errors: 0,
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Configuration
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Shared application.
    #[must_use]
    pub fn app(&self) -> &Arc<App<D>> {
        &self.app
    }

    /// Context bag.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Mutable context bag.
    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// Parameters of the switch that started the current delegate.
    #[must_use]
    pub fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }

    /// Route key of the current (or last) delegate.
    #[must_use]
    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    /// Renderer mode from the handshake.
    #[must_use]
    pub fn mode(&self) -> Option<&str> {
        self.mode.as_deref()
    }

    /// Resolved locale tag.
    #[must_use]
    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    /// Input-capable leaves in the most recent `Output`.
    #[must_use]
    pub fn expected_inputs(&self) -> usize {
        self.expected_inputs
    }

    /// Handle a message that arrived while no delegate is running.
    ///
    /// `None` is end-of-stream. Valid in `AwaitingJoin`, `Idle` and `Closed`.
    pub fn handle_inbound(&mut self, inbound: Option<Bytes>) -> Vec<SessionAction<D>> {
        if self.state == SessionState::Closed {
            return vec![SessionAction::Close];
        }

        let Some(bytes) = inbound else {
            info!(route = ?self.route, state = ?self.state, "session closed by peer");
            self.state = SessionState::Closed;
            return vec![SessionAction::Close];
        };

        let message = match Message::decode(&bytes) {
            Ok(message) => message,
            Err(err) => {
                warn!(%err, state = ?self.state, "dropping malformed message");
                return self.report(ErrorPayload::malformed(err.to_string()));
            },
        };

        debug!(opcode = %message.opcode(), state = ?self.state, "inbound");

        match (self.state, message) {
            (SessionState::AwaitingJoin, Message::Join(join)) => self.on_join(join),
            (SessionState::AwaitingJoin, other) => {
                warn!(opcode = %other.opcode(), "message before Join");
                self.report(ErrorPayload::unexpected("Join", other.opcode().name()))
            },
            (_, Message::Switch(switch)) => self.on_client_switch(switch),
            (_, Message::Input(_)) => {
                debug!("ignoring stale input");
                Vec::new()
            },
            (_, Message::Error(err)) => {
                error!(code = err.code, text = %err.text, "renderer reported an error");
                self.fail(SessionError::Remote { code: err.code, text: err.text })
            },
            (_, other) => {
                warn!(opcode = %other.opcode(), "unexpected message while idle");
                self.report(ErrorPayload::unexpected("Switch", other.opcode().name()))
            },
        }
    }

    /// Decide what happens after a delegate run ends.
    pub fn finish_dispatch(&mut self, result: Result<(), UiError>) -> Vec<SessionAction<D>> {
        // The delegate's stack is gone; so is any switch it was waiting on.
        self.pending_switch = None;

        match result {
            Ok(()) => {
                debug!(route = ?self.route, "delegate returned");
                self.state = SessionState::Idle;
                Vec::new()
            },
            Err(UiError::Switch(jump)) => {
                self.state = SessionState::Idle;
                self.switch_to(jump)
            },
            Err(UiError::Closed) => {
                self.state = SessionState::Closed;
                vec![SessionAction::Close]
            },
            Err(UiError::Remote { code, text }) => {
                error!(code, %text, route = ?self.route, "renderer reported an error");
                self.fail(SessionError::Remote { code, text })
            },
            Err(UiError::Transport(err)) => {
                error!(%err, route = ?self.route, "transport failed");
                self.fail(SessionError::Transport(err))
            },
            Err(err) => {
                warn!(%err, route = ?self.route, "delegate failed, restarting it");
                let payload =
                    err.to_payload().unwrap_or_else(|| ErrorPayload::application(err.to_string()));
                let mut actions = self.report(payload);
                if let Some(SessionAction::Fail(_)) = actions.last() {
                    return actions;
                }
                if let Some(delegate) = &self.delegate {
                    self.state = SessionState::Dispatching;
                    actions.push(SessionAction::Dispatch(Arc::clone(delegate)));
                } else {
                    self.state = SessionState::Idle;
                }
                actions
            },
        }
    }

    /// Encode a render request as an `Output`.
    ///
    /// Returns the bytes to send and whether to wait for a reply. Records the
    /// number of input-capable leaves for the arity check.
    ///
    /// # Errors
    ///
    /// - `UiError::Closed` if the session is closed
    /// - `UiError::Edit` / `UiError::Tree` for an invalid request
    /// - `UiError::Encode` if the message cannot be encoded
    pub fn prepare_output(&mut self, view: View) -> Result<(Bytes, bool), UiError> {
        self.ensure_open()?;

        let read = view.reads();
        let output = view.into_output()?;
        let expected = output.root.input_count();
        let bytes = self.encode(output.into()).map_err(UiError::Encode)?;

        debug!(inputs = expected, read, "output");
        self.expected_inputs = expected;
        if read {
            self.state = SessionState::AwaitingInput;
        }
        Ok((bytes, read))
    }

    /// Interpret the reply to a render call.
    ///
    /// # Errors
    ///
    /// - `UiError::Closed` on end-of-stream
    /// - `UiError::Switch` when the renderer requests a context switch
    /// - `UiError::Route` when that switch names an unknown route
    /// - `UiError::Remote` when the renderer sends `Error`
    /// - `UiError::Decode` / `UiError::Unexpected` for invalid replies
    pub fn accept_reply(&mut self, inbound: Option<Bytes>) -> Result<Reply, UiError> {
        let message = self.decode_inbound(inbound)?;
        match message {
            Message::Input(input) => {
                if input.len() != self.expected_inputs {
                    warn!(
                        expected = self.expected_inputs,
                        got = input.len(),
                        "input arity does not match rendered inputs"
                    );
                }
                self.consecutive_errors = 0;
                self.state = SessionState::Dispatching;
                Ok(Reply::from_values(input.into_values()))
            },
            Message::Switch(switch) => {
                self.app.resolve(&switch.method)?;
                debug!(route = %switch.method, "client requested switch");
                Err(UiError::Switch(Jump {
                    target: switch.method,
                    params: switch.params.unwrap_or_default(),
                }))
            },
            Message::Error(err) => Err(UiError::Remote { code: err.code, text: err.text }),
            other => Err(UiError::Unexpected { expected: "Input or Switch", got: other.opcode() }),
        }
    }

    /// Start a server-initiated context switch.
    ///
    /// Resolves `target` first, then returns the `Switch` request to send.
    ///
    /// # Errors
    ///
    /// - `UiError::SwitchInFlight` if an earlier switch awaits its ack
    /// - `UiError::Route` if `target` is not registered
    /// - `UiError::Closed` / `UiError::Encode`
    pub fn begin_jump(
        &mut self,
        target: &str,
        params: BTreeMap<String, Value>,
    ) -> Result<Bytes, UiError> {
        self.ensure_open()?;

        if let Some(pending) = &self.pending_switch {
            warn!(pending = %pending.target, requested = target, "switch already in flight");
            return Err(UiError::SwitchInFlight(pending.target.clone()));
        }
        self.app.resolve(target)?;

        let request = Switch::new(target).with_params(params.clone());
        let bytes = self.encode(request.into()).map_err(UiError::Encode)?;

        debug!(route = target, "switch requested");
        self.pending_switch = Some(Jump { target: target.to_string(), params });
        Ok(bytes)
    }

    /// Interpret a message received while waiting for a switch ack.
    ///
    /// `Ok(None)` means "not the ack, keep waiting" (stale `Input`).
    ///
    /// # Errors
    ///
    /// Same conditions as [`Session::accept_reply`], except that `Switch` is
    /// the expected message.
    pub fn accept_jump_ack(&mut self, inbound: Option<Bytes>) -> Result<Option<Jump>, UiError> {
        let message = self.decode_inbound(inbound)?;
        match message {
            Message::Switch(ack) => {
                let Some(jump) = self.pending_switch.take() else {
                    return Err(UiError::Unexpected { expected: "Input", got: Opcode::Switch });
                };
                if ack.method != jump.target {
                    warn!(
                        requested = %jump.target,
                        acked = %ack.method,
                        "switch ack names another route"
                    );
                }
                self.consecutive_errors = 0;
                Ok(Some(jump))
            },
            Message::Input(_) => {
                debug!("ignoring stale input while awaiting switch ack");
                Ok(None)
            },
            Message::Error(err) => Err(UiError::Remote { code: err.code, text: err.text }),
            other => Err(UiError::Unexpected { expected: "Switch", got: other.opcode() }),
        }
    }

    /// Encode an out-of-band settings update.
    ///
    /// # Errors
    ///
    /// - `UiError::Closed` / `UiError::Encode`
    pub fn prepare_settings(&mut self, settings: Settings) -> Result<Bytes, UiError> {
        self.ensure_open()?;
        self.encode(settings.into()).map_err(UiError::Encode)
    }

    fn on_join(&mut self, join: Join) -> Vec<SessionAction<D>> {
        let requested = join.method.as_deref().filter(|method| !method.is_empty());
        let (route, delegate) = match requested.map(|method| (method, self.app.resolve(method))) {
            Some((method, Ok(delegate))) => (method.to_string(), delegate),
            Some((method, Err(err))) => {
                warn!(method, %err, "unknown entry route, starting at root");
                (self.app.root_key().to_string(), Arc::clone(self.app.root()))
            },
            None => (self.app.root_key().to_string(), Arc::clone(self.app.root())),
        };

        let locale = self.app.resolve_locale(join.locale.as_deref()).map(str::to_string);
        let settings = self.app.settings(join.mode.as_deref(), locale.as_deref());
        let ack = match self.encode(settings.into()) {
            Ok(bytes) => bytes,
            Err(err) => return self.fail(SessionError::Protocol(err)),
        };

        info!(%route, mode = ?join.mode, locale = ?locale, "session joined");
        self.mode = join.mode;
        self.locale = locale;
        self.route = Some(route);
        self.delegate = Some(Arc::clone(&delegate));
        self.state = SessionState::Dispatching;
        self.consecutive_errors = 0;

        vec![SessionAction::Send(ack), SessionAction::Dispatch(delegate)]
    }

    fn on_client_switch(&mut self, switch: Switch) -> Vec<SessionAction<D>> {
        let jump = Jump { target: switch.method, params: switch.params.unwrap_or_default() };
        self.switch_to(jump)
    }

    fn switch_to(&mut self, jump: Jump) -> Vec<SessionAction<D>> {
        match self.app.resolve(&jump.target) {
            Ok(delegate) => {
                info!(from = ?self.route, to = %jump.target, "context switch");
                self.route = Some(jump.target);
                self.params = jump.params;
                self.delegate = Some(Arc::clone(&delegate));
                self.state = SessionState::Dispatching;
                self.consecutive_errors = 0;
                vec![SessionAction::Dispatch(delegate)]
            },
            Err(err) => {
                warn!(%err, "switch to unknown route");
                self.report(ErrorPayload::route_not_found(&jump.target))
            },
        }
    }

    fn decode_inbound(&mut self, inbound: Option<Bytes>) -> Result<Message, UiError> {
        let Some(bytes) = inbound else {
            info!(route = ?self.route, state = ?self.state, "session closed by peer");
            self.state = SessionState::Closed;
            return Err(UiError::Closed);
        };

        let message = Message::decode(&bytes).map_err(UiError::Decode)?;
        debug!(opcode = %message.opcode(), state = ?self.state, "inbound");
        Ok(message)
    }

    fn report(&mut self, payload: ErrorPayload) -> Vec<SessionAction<D>> {
        self.consecutive_errors += 1;
        if self.consecutive_errors > self.config.max_consecutive_errors {
            error!(count = self.consecutive_errors, "too many consecutive errors");
            return self.fail(SessionError::TooManyErrors { count: self.consecutive_errors });
        }

        match self.encode(payload.into()) {
            Ok(bytes) => vec![SessionAction::Send(bytes)],
            Err(err) => self.fail(SessionError::Protocol(err)),
        }
    }

    fn fail(&mut self, err: SessionError) -> Vec<SessionAction<D>> {
        self.state = SessionState::Closed;
        vec![SessionAction::Fail(err)]
    }

    fn ensure_open(&self) -> Result<(), UiError> {
        if self.state == SessionState::Closed {
            return Err(UiError::Closed);
        }
        Ok(())
    }

    fn encode(&self, message: Message) -> Result<Bytes, ProtocolError> {
        Ok(message.into_frame(self.config.format)?.to_bytes())
    }
}

impl<D: ?Sized> fmt::Debug for Session<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("route", &self.route)
            .field("pending_switch", &self.pending_switch)
            .field("consecutive_errors", &self.consecutive_errors)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use boxwire_proto::{Node, payloads::Input};

    use super::*;
    use crate::{error::TransportError, registry::Route};

    type Page = dyn Fn() -> &'static str + Send + Sync;

    fn page(label: &'static str) -> Arc<Page> {
        Arc::new(move || label)
    }

    fn session() -> Session<Page> {
        let app = App::builder(Route::to("home", page("home")))
            .title("Test")
            .route(Route::to("B", page("B")))
            .build()
            .expect("valid app");
        Session::new(app, SessionConfig { format: WireFormat::Json, ..SessionConfig::default() })
    }

    fn wire(message: impl Into<Message>) -> Option<Bytes> {
        Some(message.into().encode(WireFormat::Json).expect("encode"))
    }

    fn sent(actions: &[SessionAction<Page>]) -> Vec<Message> {
        actions
            .iter()
            .filter_map(|action| match action {
                SessionAction::Send(bytes) => Some(Message::decode(bytes).expect("decode")),
                _ => None,
            })
            .collect()
    }

    fn dispatched(actions: &[SessionAction<Page>]) -> Option<&'static str> {
        actions.iter().find_map(|action| match action {
            SessionAction::Dispatch(delegate) => Some(delegate()),
            _ => None,
        })
    }

    fn joined() -> Session<Page> {
        let mut session = session();
        session.handle_inbound(wire(Join::default()));
        session
    }

    #[test]
    fn join_acks_and_dispatches_root() {
        let mut session = session();
        let actions = session.handle_inbound(wire(Join::default().with_mode("web")));

        let messages = sent(&actions);
        assert!(matches!(&messages[0], Message::Set(s) if s.title.as_deref() == Some("Test")));
        assert_eq!(dispatched(&actions), Some("home"));
        assert_eq!(session.state(), SessionState::Dispatching);
        assert_eq!(session.mode(), Some("web"));
    }

    #[test]
    fn join_with_known_method_dispatches_it() {
        let mut session = session();
        let actions = session.handle_inbound(wire(Join::at("B")));
        assert_eq!(dispatched(&actions), Some("B"));
        assert_eq!(session.route(), Some("B"));
    }

    #[test]
    fn join_with_unknown_method_falls_back_to_root() {
        let mut session = session();
        let actions = session.handle_inbound(wire(Join::at("nope")));
        assert_eq!(dispatched(&actions), Some("home"));
    }

    #[test]
    fn non_join_before_handshake_is_reported() {
        let mut session = session();
        let actions = session.handle_inbound(wire(Input::default()));

        let messages = sent(&actions);
        assert!(matches!(
            &messages[0],
            Message::Error(e) if e.code == ErrorPayload::UNEXPECTED_MESSAGE
        ));
        assert_eq!(dispatched(&actions), None);
        assert_eq!(session.state(), SessionState::AwaitingJoin);
    }

    #[test]
    fn garbage_before_handshake_is_reported() {
        let mut session = session();
        let actions = session.handle_inbound(Some(Bytes::from_static(b"garbage!")));
        assert!(matches!(
            &sent(&actions)[0],
            Message::Error(e) if e.code == ErrorPayload::MALFORMED_MESSAGE
        ));
    }

    #[test]
    fn end_of_stream_closes_without_sending() {
        let mut session = session();
        let actions = session.handle_inbound(None);
        assert!(matches!(actions.as_slice(), [SessionAction::Close]));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn reply_resolves_by_arity() {
        let mut session = joined();
        let view = View::of([Node::new().value("a"), Node::new().value("b")]);
        let (_, read) = session.prepare_output(view).expect("output");
        assert!(read);
        assert_eq!(session.state(), SessionState::AwaitingInput);
        assert_eq!(session.expected_inputs(), 2);

        let reply = session
            .accept_reply(wire(Input::from_values([Value::from("x"), Value::from("y")])))
            .expect("reply");
        assert_eq!(reply, Reply::Many(vec![Value::from("x"), Value::from("y")]));
        assert_eq!(session.state(), SessionState::Dispatching);
    }

    #[test]
    fn client_switch_during_render_surfaces_as_switch() {
        let mut session = joined();
        session.prepare_output(View::new(Node::text("hi"))).expect("output");

        let err = session.accept_reply(wire(Switch::new("B"))).expect_err("switch");
        assert!(matches!(&err, UiError::Switch(jump) if jump.target == "B"));

        let unknown = session.accept_reply(wire(Switch::new("X"))).expect_err("unknown");
        assert!(matches!(unknown, UiError::Route(_)));
    }

    #[test]
    fn wrong_reply_type_is_distinguishable() {
        let mut session = joined();
        assert!(matches!(
            session.accept_reply(wire(Join::default())),
            Err(UiError::Unexpected { .. })
        ));
        assert!(matches!(
            session.accept_reply(wire(ErrorPayload::application("boom"))),
            Err(UiError::Remote { code: ErrorPayload::APPLICATION, .. })
        ));
        assert!(matches!(
            session.accept_reply(Some(Bytes::from_static(b"\0\0"))),
            Err(UiError::Decode(_))
        ));
        assert!(matches!(session.accept_reply(None), Err(UiError::Closed)));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn second_jump_is_rejected_until_ack() {
        let mut session = joined();
        session.begin_jump("B", BTreeMap::new()).expect("first jump");
        assert_eq!(
            session.begin_jump("home", BTreeMap::new()),
            Err(UiError::SwitchInFlight("B".into()))
        );

        assert_eq!(session.accept_jump_ack(wire(Input::default())), Ok(None));
        let jump = session.accept_jump_ack(wire(Switch::new("B"))).expect("ack");
        assert_eq!(jump.map(|j| j.target), Some("B".to_string()));
        assert!(session.begin_jump("home", BTreeMap::new()).is_ok());
    }

    #[test]
    fn jump_to_unknown_route_sends_nothing() {
        let mut session = joined();
        let err = session.begin_jump("X", BTreeMap::new()).expect_err("unknown");
        assert!(matches!(err, UiError::Route(_)));
        assert!(session.begin_jump("B", BTreeMap::new()).is_ok());
    }

    #[test]
    fn switch_result_dispatches_target_with_params() {
        let mut session = joined();
        session.context_mut().insert("user", "Ann");

        let params = BTreeMap::from([("id".to_string(), Value::Int(7))]);
        let actions =
            session.finish_dispatch(Err(UiError::Switch(Jump { target: "B".into(), params })));

        assert_eq!(dispatched(&actions), Some("B"));
        assert_eq!(session.params().get("id"), Some(&Value::Int(7)));
        assert_eq!(session.context().get("user"), Some(&Value::from("Ann")));
    }

    #[test]
    fn protocol_errors_report_and_redispatch() {
        let mut session = joined();
        let actions = session.finish_dispatch(Err(UiError::application("oops")));

        assert!(matches!(
            &sent(&actions)[0],
            Message::Error(e) if e.code == ErrorPayload::APPLICATION && e.text == "oops"
        ));
        assert_eq!(dispatched(&actions), Some("home"));
    }

    #[test]
    fn repeated_errors_give_up() {
        let mut session = session();
        session.config.max_consecutive_errors = 2;
        session.handle_inbound(wire(Join::default()));

        for _ in 0..2 {
            let actions = session.finish_dispatch(Err(UiError::application("again")));
            assert_eq!(dispatched(&actions), Some("home"));
        }
        let actions = session.finish_dispatch(Err(UiError::application("again")));
        assert!(matches!(
            actions.as_slice(),
            [SessionAction::Fail(SessionError::TooManyErrors { count: 3 })]
        ));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn remote_error_ends_session() {
        let mut session = joined();
        let actions =
            session.finish_dispatch(Err(UiError::Remote { code: 1, text: "bad".into() }));
        assert!(matches!(actions.as_slice(), [SessionAction::Fail(SessionError::Remote { .. })]));
    }

    #[test]
    fn transport_and_close_are_never_reported() {
        let mut session = joined();
        let actions = session.finish_dispatch(Err(TransportError::Disconnected.into()));
        assert!(sent(&actions).is_empty());
        assert!(matches!(
            actions.as_slice(),
            [SessionAction::Fail(SessionError::Transport(TransportError::Disconnected))]
        ));

        let mut session = joined();
        let actions = session.finish_dispatch(Err(UiError::Closed));
        assert!(matches!(actions.as_slice(), [SessionAction::Close]));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn idle_session_follows_client_switch() {
        let mut session = joined();
        assert!(session.finish_dispatch(Ok(())).is_empty());
        assert_eq!(session.state(), SessionState::Idle);

        assert!(session.handle_inbound(wire(Input::default())).is_empty());
        assert_eq!(dispatched(&session.handle_inbound(wire(Switch::new("B")))), Some("B"));
    }

    #[test]
    fn idle_switch_to_unknown_route_is_reported() {
        let mut session = joined();
        session.finish_dispatch(Ok(()));
        let actions = session.handle_inbound(wire(Switch::new("X")));
        assert!(matches!(
            &sent(&actions)[0],
            Message::Error(e) if e.code == ErrorPayload::ROUTE_NOT_FOUND
        ));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn closed_session_refuses_output() {
        let mut session = joined();
        session.handle_inbound(None);
        assert!(matches!(
            session.prepare_output(View::new(Node::text("late"))),
            Err(UiError::Closed)
        ));
    }
}
