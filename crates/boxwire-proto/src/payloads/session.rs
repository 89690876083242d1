//! Handshake, settings, switch and error payloads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Value, view::Choice};

/// Client handshake: the first message on every connection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Join {
    /// Requested entry route key (root when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Renderer mode (e.g. "web", "embed")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    /// Preferred locale tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

impl Join {
    /// Join at a specific route.
    pub fn at(method: impl Into<String>) -> Self {
        Self { method: Some(method.into()), ..Self::default() }
    }

    /// Set the preferred locale.
    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Set the renderer mode.
    #[must_use]
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }
}

/// Session settings, sent as the handshake ack and as out-of-band updates.
///
/// Every field is optional: an update only carries what changed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Window title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Subtitle shown under the title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,

    /// Main menu entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu: Option<Vec<Choice>>,

    /// Navigation bar entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nav: Option<Vec<Choice>>,

    /// Color scheme
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,

    /// Renderer-side script bundles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins: Option<Vec<Plugin>>,

    /// Resolved string table for the session locale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<BTreeMap<String, String>>,

    /// Renderer mode echoed back from the handshake
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

impl Settings {
    /// Settings carrying only a title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self { title: Some(title.into()), ..Self::default() }
    }

    /// Whether no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Renderer color scheme.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Theme {
    /// "light" or "dark"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    /// Page background color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,

    /// Text color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreground_color: Option<String>,

    /// Highlight color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent_color: Option<String>,

    /// Named palette entry for the highlight color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent_color_name: Option<String>,
}

/// A named bundle of renderer-side scripts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plugin {
    /// Plugin name
    pub name: String,

    /// Scripts to load, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scripts: Vec<Script>,
}

impl Plugin {
    /// Plugin with no scripts.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), scripts: Vec::new() }
    }

    /// Append a script.
    #[must_use]
    pub fn script(mut self, script: Script) -> Self {
        self.scripts.push(script);
        self
    }
}

/// One `<script>`-like resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    /// Script URL
    pub source: String,

    /// Load without blocking
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asynchronous: Option<bool>,

    /// CORS setting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_origin: Option<String>,

    /// Referrer policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer_policy: Option<String>,

    /// Subresource integrity hash
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,

    /// Script type (e.g. "module")
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Script {
    /// Script with only a source.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            asynchronous: None,
            cross_origin: None,
            referrer_policy: None,
            integrity: None,
            kind: None,
        }
    }
}

/// Context switch request (server) or acknowledgement/request (client).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Switch {
    /// Target route key
    pub method: String,

    /// Parameters handed to the target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<BTreeMap<String, Value>>,
}

impl Switch {
    /// Switch without parameters.
    pub fn new(method: impl Into<String>) -> Self {
        Self { method: method.into(), params: None }
    }

    /// Attach parameters. An empty map is sent as absent.
    #[must_use]
    pub fn with_params(mut self, params: BTreeMap<String, Value>) -> Self {
        self.params = (!params.is_empty()).then_some(params);
        self
    }
}

/// Error payload for error frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Error code identifying the type of error.
    pub code: u16,
    /// Human-readable error message.
    pub text: String,
}

impl ErrorPayload {
    /// Message could not be decoded.
    pub const MALFORMED_MESSAGE: u16 = 0x0001;
    /// Message type not valid in the current state.
    pub const UNEXPECTED_MESSAGE: u16 = 0x0002;
    /// Switch target is not a registered route.
    pub const ROUTE_NOT_FOUND: u16 = 0x0003;
    /// Render request carried an invalid edit or widget tree.
    pub const INVALID_EDIT: u16 = 0x0004;
    /// A switch was requested while another awaited its ack.
    pub const SWITCH_IN_FLIGHT: u16 = 0x0005;
    /// Application code reported a failure.
    pub const APPLICATION: u16 = 0x0006;

    /// Create an error with an arbitrary code.
    pub fn new(code: u16, text: impl Into<String>) -> Self {
        Self { code, text: text.into() }
    }

    /// Create a malformed message error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::new(Self::MALFORMED_MESSAGE, reason)
    }

    /// Create an unexpected message error.
    pub fn unexpected(expected: &str, got: &str) -> Self {
        Self::new(Self::UNEXPECTED_MESSAGE, format!("expected {expected}, got {got}"))
    }

    /// Create a route not found error.
    pub fn route_not_found(token: &str) -> Self {
        Self::new(Self::ROUTE_NOT_FOUND, format!("route not found: {token}"))
    }

    /// Create an invalid edit error.
    pub fn invalid_edit(reason: impl Into<String>) -> Self {
        Self::new(Self::INVALID_EDIT, reason)
    }

    /// Create a switch-in-flight error.
    pub fn switch_in_flight(pending: &str) -> Self {
        Self::new(Self::SWITCH_IN_FLIGHT, format!("switch to {pending} still awaiting ack"))
    }

    /// Create an application error.
    pub fn application(reason: impl Into<String>) -> Self {
        Self::new(Self::APPLICATION, reason)
    }
}
