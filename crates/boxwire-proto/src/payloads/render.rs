//! Render loop payloads: `Output` (server to renderer) and `Input` (back).

use serde::{Deserialize, Serialize};

use crate::{Edit, Value, view::Node};

/// A rendered widget tree plus how to merge it into the current view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    /// Root of the rendered tree
    #[serde(rename = "box")]
    pub root: Node,

    /// Edit descriptor; absent means "replace the whole view"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit: Option<Edit>,
}

impl Output {
    /// Output that replaces the whole view.
    #[must_use]
    pub fn new(root: Node) -> Self {
        Self { root, edit: None }
    }

    /// Attach an edit. The whole-view update is stored as absent.
    #[must_use]
    pub fn with_edit(mut self, edit: Edit) -> Self {
        self.edit = (!edit.is_replace_all()).then_some(edit);
        self
    }

    /// Effective edit, with absence read as the whole-view update.
    #[must_use]
    pub fn effective_edit(&self) -> Edit {
        self.edit.clone().unwrap_or_default()
    }
}

/// One `[kind, value]` pair of an `Input` message.
///
/// `kind` is a renderer-defined widget code; the engine passes it through
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputEntry(pub i64, pub Value);

impl InputEntry {
    /// Widget kind code.
    #[must_use]
    pub fn kind(&self) -> i64 {
        self.0
    }

    /// Submitted value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.1
    }
}

/// User input: one entry per input-capable leaf of the last `Output`, in
/// document order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Input {
    /// Ordered `[kind, value]` pairs
    #[serde(default)]
    pub inputs: Vec<InputEntry>,
}

impl Input {
    /// Input with a generic kind code for every value.
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self { inputs: values.into_iter().map(|v| InputEntry(0, v)).collect() }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Whether no entries were sent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Submitted values, dropping the kind codes.
    pub fn into_values(self) -> Vec<Value> {
        self.inputs.into_iter().map(|entry| entry.1).collect()
    }
}
