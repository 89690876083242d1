//! Scripted renderer.
//!
//! Plays the client side of a session over a [`DuplexEnd`]: sends `Join`,
//! `Input` and `Switch` messages and decodes what the engine sends back. Every
//! `Output` is applied to a local copy of the view with its edit, so tests can
//! assert on the tree a real renderer would be showing.

use std::time::Duration;

use boxwire_core::{TransportError, duplex::DuplexEnd};
use boxwire_proto::{
    EditError, Item, Message, Node, Opcode, ProtocolError, Value, WireFormat,
    edit,
    payloads::{ErrorPayload, Input, Join, Output, Settings, Switch},
};
use bytes::Bytes;
use thiserror::Error;
use tracing::trace;

/// Longest wait for one server message in async tests.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Scripted renderer failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HarnessError {
    /// Server closed the stream
    #[error("server closed the session")]
    Closed,

    /// No message within [`RECV_TIMEOUT`]
    #[error("timed out waiting for the server")]
    Timeout,

    /// Server sent bytes that do not decode
    #[error("undecodable server message: {0}")]
    Decode(#[from] ProtocolError),

    /// Server sent a different message than the script expected
    #[error("expected {expected}, got {got}")]
    Unexpected {
        /// Message type the script waited for
        expected: Opcode,
        /// Message type received
        got: Opcode,
    },

    /// An `Output` edit does not apply to the current view
    #[error("edit does not apply: {0}")]
    Edit(#[from] EditError),

    /// Server sent a message where end-of-stream was expected
    #[error("expected end of stream, got {0}")]
    NotClosed(Opcode),

    /// Server end is gone
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Client side of one session.
#[derive(Debug)]
pub struct Renderer {
    end: DuplexEnd,
    format: WireFormat,
    view: Vec<Item>,
    settings: Vec<Settings>,
    transcript: Vec<Opcode>,
}

impl Renderer {
    /// Renderer speaking the preferred payload format.
    pub fn new(end: DuplexEnd) -> Self {
        Self {
            end,
            format: WireFormat::preferred(),
            view: Vec::new(),
            settings: Vec::new(),
            transcript: Vec::new(),
        }
    }

    /// Use `format` for messages sent to the server.
    #[must_use]
    pub fn with_format(mut self, format: WireFormat) -> Self {
        self.format = format;
        self
    }

    /// Send any message.
    pub fn send(&mut self, message: impl Into<Message>) -> Result<(), HarnessError> {
        let bytes = message.into().encode(self.format)?;
        self.end.push(bytes)?;
        Ok(())
    }

    /// Send raw bytes, bypassing the codec.
    pub fn send_raw(&mut self, bytes: impl Into<Bytes>) -> Result<(), HarnessError> {
        self.end.push(bytes.into())?;
        Ok(())
    }

    /// Open the session.
    pub fn join(&mut self, join: Join) -> Result<(), HarnessError> {
        self.send(join)
    }

    /// Answer the last `Output` with kind-0 inputs.
    pub fn reply(&mut self, values: impl IntoIterator<Item = Value>) -> Result<(), HarnessError> {
        self.send(Input::from_values(values))
    }

    /// Request (or acknowledge) a switch to `method`.
    pub fn switch(&mut self, method: &str) -> Result<(), HarnessError> {
        self.send(Switch::new(method))
    }

    /// End the stream.
    pub fn close(&self) {
        self.end.close();
    }

    /// Next server message, applying it to the local view.
    pub async fn recv(&mut self) -> Result<Message, HarnessError> {
        let next = tokio::time::timeout(RECV_TIMEOUT, self.end.pop())
            .await
            .map_err(|_| HarnessError::Timeout)?;
        self.observe(next)
    }

    /// Blocking variant of [`Renderer::recv`] for thread-per-session tests.
    pub fn recv_blocking(&mut self) -> Result<Message, HarnessError> {
        let next = self.end.pop_blocking();
        self.observe(next)
    }

    /// Next message must be an `Output`.
    pub async fn expect_output(&mut self) -> Result<Output, HarnessError> {
        output(self.recv().await?)
    }

    /// Blocking [`Renderer::expect_output`].
    pub fn expect_output_blocking(&mut self) -> Result<Output, HarnessError> {
        output(self.recv_blocking()?)
    }

    /// Next message must be a `Set`.
    pub async fn expect_settings(&mut self) -> Result<Settings, HarnessError> {
        match self.recv().await? {
            Message::Set(settings) => Ok(settings),
            other => Err(unexpected(Opcode::Set, &other)),
        }
    }

    /// Blocking [`Renderer::expect_settings`].
    pub fn expect_settings_blocking(&mut self) -> Result<Settings, HarnessError> {
        match self.recv_blocking()? {
            Message::Set(settings) => Ok(settings),
            other => Err(unexpected(Opcode::Set, &other)),
        }
    }

    /// Next message must be a `Switch` request.
    pub async fn expect_switch(&mut self) -> Result<Switch, HarnessError> {
        switch(self.recv().await?)
    }

    /// Blocking [`Renderer::expect_switch`].
    pub fn expect_switch_blocking(&mut self) -> Result<Switch, HarnessError> {
        switch(self.recv_blocking()?)
    }

    /// Next message must be an `Error` report.
    pub async fn expect_error(&mut self) -> Result<ErrorPayload, HarnessError> {
        match self.recv().await? {
            Message::Error(err) => Ok(err),
            other => Err(unexpected(Opcode::Error, &other)),
        }
    }

    /// The server must close the stream without sending anything else.
    pub async fn expect_closed(&mut self) -> Result<(), HarnessError> {
        match self.recv().await {
            Err(HarnessError::Closed) => Ok(()),
            Ok(message) => Err(HarnessError::NotClosed(message.opcode())),
            Err(err) => Err(err),
        }
    }

    /// Acknowledge the next `Switch` request; returns its target.
    pub async fn ack_switch(&mut self) -> Result<Switch, HarnessError> {
        let request = self.expect_switch().await?;
        self.send(request.clone())?;
        Ok(request)
    }

    /// Blocking [`Renderer::ack_switch`].
    pub fn ack_switch_blocking(&mut self) -> Result<Switch, HarnessError> {
        let request = self.expect_switch_blocking()?;
        self.send(request.clone())?;
        Ok(request)
    }

    /// Current view after every `Output` so far.
    #[must_use]
    pub fn view(&self) -> &[Item] {
        &self.view
    }

    /// Names of the top-level view entries.
    #[must_use]
    pub fn names(&self) -> Vec<Option<&str>> {
        edit::names(&self.view)
    }

    /// First node named `name` anywhere in the view, depth first.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Node> {
        find_in(&self.view, name)
    }

    /// Every `Set` received, handshake ack first.
    #[must_use]
    pub fn settings_history(&self) -> &[Settings] {
        &self.settings
    }

    /// Opcodes of every message received, in order.
    #[must_use]
    pub fn transcript(&self) -> &[Opcode] {
        &self.transcript
    }

    fn observe(&mut self, next: Option<Bytes>) -> Result<Message, HarnessError> {
        let bytes = next.ok_or(HarnessError::Closed)?;
        let message = Message::decode(&bytes)?;
        trace!(opcode = %message.opcode(), "renderer received");
        self.transcript.push(message.opcode());

        match &message {
            Message::Output(output) => {
                let content = vec![Item::Node(output.root.clone())];
                output.effective_edit().apply(&mut self.view, content)?;
            },
            Message::Set(settings) => self.settings.push(settings.clone()),
            _ => {},
        }
        Ok(message)
    }
}

fn output(message: Message) -> Result<Output, HarnessError> {
    match message {
        Message::Output(output) => Ok(output),
        other => Err(unexpected(Opcode::Output, &other)),
    }
}

fn switch(message: Message) -> Result<Switch, HarnessError> {
    match message {
        Message::Switch(switch) => Ok(switch),
        other => Err(unexpected(Opcode::Switch, &other)),
    }
}

fn unexpected(expected: Opcode, got: &Message) -> HarnessError {
    HarnessError::Unexpected { expected, got: got.opcode() }
}

fn find_in<'a>(items: &'a [Item], name: &str) -> Option<&'a Node> {
    items.iter().find_map(|item| match item {
        Item::Node(node) if node.name.as_deref() == Some(name) => Some(node),
        Item::Node(node) => find_in(node.items.as_deref().unwrap_or_default(), name),
        Item::Text(_) => None,
    })
}
