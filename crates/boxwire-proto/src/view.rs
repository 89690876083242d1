//! Widget tree model.
//!
//! A [`Node`] is one box of the server-described UI. Nodes are built fresh for
//! every render, handed to the codec once and then dropped; the server keeps no
//! copy of what the renderer shows.
//!
//! Serialization is canonical: absent fields are omitted entirely, so
//! [`Node::dump`] of a node with only `text` set is exactly `{id, text}`.

use std::{
    collections::{BTreeMap, HashSet},
    sync::atomic::{AtomicU64, Ordering},
};

use serde::{Deserialize, Serialize, Serializer};

use crate::{Value, errors::Result};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a node id that is unique for the lifetime of the process.
///
/// Backed by an atomic counter, so concurrent sessions never hand out the same
/// id.
#[must_use]
pub fn next_node_id() -> String {
    format!("b{}", NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
}

fn is_absent(value: &Option<Value>) -> bool {
    value.as_ref().is_none_or(Value::is_null)
}

/// Keys owned by [`Node`]'s own fields. Attributes never use them.
pub const RESERVED_KEYS: [&str; 8] =
    ["id", "name", "text", "mode", "value", "options", "headers", "items"];

fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Presentational attributes passed through to the renderer untouched.
///
/// `Null` entries and [`RESERVED_KEYS`] are never serialized.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(transparent)]
pub struct Attrs(BTreeMap<String, Value>);

impl Serialize for Attrs {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.0.iter().filter(|(key, value)| !value.is_null() && !is_reserved(key)),
        )
    }
}

impl Attrs {
    /// Attribute value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no attributes are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One node of the widget tree (a "box").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Server-generated id, stable for the node's lifetime.
    pub id: String,

    /// Author-given selector alias. Unique among siblings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Display text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Widget kind tag (`"text"`, `"button"`, `"menu"`, `"table"`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    /// Current or default value of an input widget.
    #[serde(default, skip_serializing_if = "is_absent")]
    pub value: Option<Value>,

    /// Selectable choices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<Choice>>,

    /// Column headers (tables).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<Choice>>,

    /// Children in document order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Item>>,

    /// Opaque presentational attributes (layout, sizing, color, ...).
    #[serde(flatten)]
    pub attrs: Attrs,
}

/// A child of a [`Node`]: either a nested node or literal text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Item {
    /// Literal text
    Text(String),
    /// Nested node
    Node(Node),
}

impl From<Node> for Item {
    fn from(node: Node) -> Self {
        Self::Node(node)
    }
}

impl From<&str> for Item {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Item {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// Sibling name collision found by [`Node::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("duplicate sibling name '{name}' under node {parent}")]
pub struct DuplicateName {
    /// Id of the node whose children collide
    pub parent: String,
    /// The repeated name
    pub name: String,
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

impl Node {
    /// Empty node with a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: next_node_id(),
            name: None,
            text: None,
            mode: None,
            value: None,
            options: None,
            headers: None,
            items: None,
            attrs: Attrs::default(),
        }
    }

    /// Node displaying `text`.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::new().with_text(text)
    }

    /// Container node holding `items` in order.
    #[must_use]
    pub fn group<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Item>,
    {
        Self::new().items(items)
    }

    /// Set the display text.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set the selector alias.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the widget kind.
    #[must_use]
    pub fn mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    /// Set the widget value. `Null` clears it.
    #[must_use]
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.value = if value.is_null() { None } else { Some(value) };
        self
    }

    /// Replace the choices.
    #[must_use]
    pub fn options(mut self, options: impl IntoIterator<Item = Choice>) -> Self {
        self.options = Some(options.into_iter().collect());
        self
    }

    /// Append one choice.
    #[must_use]
    pub fn option(mut self, option: Choice) -> Self {
        self.options.get_or_insert_with(Vec::new).push(option);
        self
    }

    /// Replace the column headers.
    #[must_use]
    pub fn headers(mut self, headers: impl IntoIterator<Item = Choice>) -> Self {
        self.headers = Some(headers.into_iter().collect());
        self
    }

    /// Replace the children.
    #[must_use]
    pub fn items<I, T>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Item>,
    {
        self.items = Some(items.into_iter().map(Into::into).collect());
        self
    }

    /// Append one child.
    #[must_use]
    pub fn item(mut self, item: impl Into<Item>) -> Self {
        self.items.get_or_insert_with(Vec::new).push(item.into());
        self
    }

    /// Set a presentational attribute. `Null` removes it.
    ///
    /// Keys in [`RESERVED_KEYS`] belong to the node's own fields and are
    /// ignored; use the dedicated builder instead.
    #[must_use]
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        let value = value.into();
        if is_reserved(&key) {
            return self;
        }

        if value.is_null() {
            self.attrs.0.remove(&key);
        } else {
            self.attrs.0.insert(key, value);
        }
        self
    }

    /// Canonical map form, exactly as a renderer receives it.
    pub fn dump(&self) -> Result<Value> {
        Value::from_serialize(self)
    }

    /// Child nodes (text items skipped).
    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.items.iter().flatten().filter_map(|item| match item {
            Item::Node(node) => Some(node),
            Item::Text(_) => None,
        })
    }

    /// Number of input-capable leaves, in document order.
    ///
    /// A node is input-capable when it carries a `value` or `options`. A node
    /// with children is never counted itself; its children are.
    #[must_use]
    pub fn input_count(&self) -> usize {
        if self.items.as_ref().is_some_and(|items| !items.is_empty()) {
            return self.children().map(Node::input_count).sum();
        }

        usize::from(self.value.is_some() || self.options.is_some())
    }

    /// Check that sibling names are unique throughout the tree.
    ///
    /// # Errors
    ///
    /// Returns the first collision in depth-first order.
    pub fn validate(&self) -> std::result::Result<(), DuplicateName> {
        let mut seen = HashSet::new();
        for child in self.children() {
            if let Some(name) = &child.name
                && !seen.insert(name.as_str())
            {
                return Err(DuplicateName { parent: self.id.clone(), name: name.clone() });
            }
        }

        self.children().try_for_each(Node::validate)
    }
}

/// One selectable choice inside a node (button, menu entry, table row, ...).
///
/// `value` is what the delegate receives when the choice is picked. For a
/// routed choice it is the route key that names the target view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    /// Value returned when chosen, or the route key of a routed choice.
    pub value: Value,

    /// Display text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Selector alias.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Icon name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    /// Secondary text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,

    /// Pre-selected flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,

    /// Nested choices (groups, sub-menus, split actions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<Choice>>,
}

impl Choice {
    /// Choice returning `value` when picked.
    #[must_use]
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            text: None,
            name: None,
            icon: None,
            caption: None,
            selected: None,
            options: None,
        }
    }

    /// Set the display text.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set the selector alias.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the icon.
    #[must_use]
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Set the secondary text.
    #[must_use]
    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Mark as selected.
    #[must_use]
    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = Some(selected);
        self
    }

    /// Replace the nested choices.
    #[must_use]
    pub fn options(mut self, options: impl IntoIterator<Item = Choice>) -> Self {
        self.options = Some(options.into_iter().collect());
        self
    }

    /// Canonical map form.
    pub fn dump(&self) -> Result<Value> {
        Value::from_serialize(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_omits_absent_fields() {
        let node = Node::text("What is your name?");
        let dumped = node.dump().expect("dump");
        let map = dumped.as_map().expect("map");

        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["id", "text"]);
        assert_eq!(dumped.get("id"), Some(&Value::Text(node.id.clone())));
    }

    #[test]
    fn null_value_and_attrs_are_not_emitted() {
        let node = Node::new().value(Value::Null).attr("width", "1px").attr("width", Value::Null);
        let dumped = node.dump().expect("dump");
        let map = dumped.as_map().expect("map");
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("id"));
    }

    #[test]
    fn attrs_are_flattened() {
        let node = Node::text("hi").attr("width", "100px").attr("grow", 1);
        let dumped = node.dump().expect("dump");
        assert_eq!(dumped.get("width"), Some(&Value::Text("100px".into())));
        assert_eq!(dumped.get("grow"), Some(&Value::Int(1)));
        assert!(dumped.get("attrs").is_none());
    }

    #[test]
    fn reserved_attr_keys_are_ignored() {
        let node = Node::text("hello").attr("id", "fake").attr("text", "shadow").attr("tone", "calm");
        assert!(node.attrs.get("id").is_none());
        assert_eq!(node.attrs.len(), 1);

        let dumped = node.dump().expect("dump");
        assert_eq!(dumped.get("id"), Some(&Value::Text(node.id.clone())));
        assert_eq!(dumped.get("text"), Some(&Value::from("hello")));
    }

    #[test]
    fn reserved_keys_in_attrs_are_not_serialized() {
        let mut node = Node::text("hello");
        node.attrs.0.insert("items".into(), Value::from("shadow"));
        let text = serde_json::to_string(&node).expect("encode");
        let back: Node = serde_json::from_str(&text).expect("decode");
        assert_eq!(back.items, None);
        assert!(back.attrs.is_empty());
    }

    #[test]
    fn nested_choices_dump_recursively() {
        let node = Node::new().mode("menu").option(
            Choice::new("file").text("File").options([Choice::new("open"), Choice::new("save")]),
        );
        let dumped = node.dump().expect("dump");
        let options = dumped.get("options").and_then(Value::as_list).expect("options");
        let nested = options[0].get("options").and_then(Value::as_list).expect("nested");
        assert_eq!(nested.len(), 2);
        assert_eq!(nested[1], Value::Map([("value".to_string(), Value::from("save"))].into()));
    }

    #[test]
    fn ids_are_unique() {
        let a = Node::new();
        let b = Node::new();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn ids_are_unique_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| (0..100).map(|_| next_node_id()).collect::<Vec<_>>()))
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for id in handle.join().expect("thread") {
                assert!(all.insert(id));
            }
        }
        assert_eq!(all.len(), 400);
    }

    #[test]
    fn input_count_counts_leaves_in_document_order() {
        let tree = Node::group([
            Node::text("Name").value("Boaty"),
            Node::text("plain label"),
            Node::group([Node::new().options([Choice::new(1)]), Node::new().value(true)]),
        ]);
        assert_eq!(tree.input_count(), 3);
        assert_eq!(Node::text("label").input_count(), 0);
        assert_eq!(Node::text("x").value(1).input_count(), 1);
    }

    #[test]
    fn validate_rejects_duplicate_sibling_names() {
        let ok = Node::group([
            Node::new().named("a").item(Node::new().named("x")),
            Node::new().named("b").item(Node::new().named("x")),
        ]);
        assert!(ok.validate().is_ok());

        let bad = Node::group([Node::new().named("a"), Node::new().named("a")]);
        let err = bad.validate().expect_err("duplicate");
        assert_eq!(err.name, "a");
    }

    #[test]
    fn text_and_node_items_survive_json() {
        let node = Node::group([Item::from("literal"), Item::from(Node::text("boxed"))]);
        let text = serde_json::to_string(&node).expect("encode");
        let back: Node = serde_json::from_str(&text).expect("decode");
        assert_eq!(back, node);
    }
}
