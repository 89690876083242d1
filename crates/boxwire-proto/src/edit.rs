//! Selector-addressed edits.
//!
//! An [`Edit`] describes how an `Output` changes the renderer's current view:
//! replace it, insert into it or remove from it, relative to a node addressed
//! by a [`Selector`]. Edits are stateless descriptors. The server trusts the
//! renderer to have applied every earlier edit; [`Edit::apply`] is the
//! reference implementation of what a renderer does with one.
//!
//! # Invariants
//!
//! - At most one of `at`, `before`, `after`, `inside` is given per edit.
//! - No anchor means "the whole view": `Inside` with no selector.
//! - Selectors are non-empty whitespace-separated paths of node names.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_repr::{Deserialize_repr, Serialize_repr};
use thiserror::Error;

use crate::view::Item;

/// What the edit does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum EditKind {
    /// Replace the addressed content
    #[default]
    Update = 0,
    /// Add content at the addressed position
    Insert = 1,
    /// Delete the addressed content
    Remove = 2,
}

/// Where the edit applies relative to the selected node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Position {
    /// The selected node's children
    #[default]
    Inside = 0,
    /// The selected node itself
    At = 1,
    /// The sibling slot before the selected node
    Before = 2,
    /// The sibling slot after the selected node
    After = 3,
}

/// Errors building or applying an edit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    /// More than one anchor given
    #[error("conflicting edit anchors: '{first}' and '{second}' are mutually exclusive")]
    Conflict {
        /// First anchor that was set
        first: &'static str,
        /// Second anchor that was set
        second: &'static str,
    },

    /// Selector contains no names
    #[error("empty selector")]
    EmptySelector,

    /// Selector does not match any node in the view
    #[error("no node matches selector '{0}'")]
    TargetNotFound(String),

    /// Before/After edit on a node that has no such sibling
    #[error("node '{0}' has no sibling at the requested position")]
    NoSibling(String),
}

/// Path of node names, outermost first.
///
/// `"colA amber"` addresses the node named `amber` somewhere inside the node
/// named `colA`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selector(Vec<String>);

impl Selector {
    /// Parse a whitespace-separated selector.
    ///
    /// # Errors
    ///
    /// - `EditError::EmptySelector` if the string holds no names
    pub fn parse(selector: &str) -> Result<Self, EditError> {
        let path: Vec<String> = selector.split_whitespace().map(str::to_string).collect();
        if path.is_empty() {
            return Err(EditError::EmptySelector);
        }
        Ok(Self(path))
    }

    /// Names along the path.
    #[must_use]
    pub fn path(&self) -> &[String] {
        &self.0
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

impl std::str::FromStr for Selector {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Selector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Selector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Anchor arguments for [`Edit::new`].
///
/// Mirrors the keyword style of a render call: at most one field may be set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Locator {
    /// Address the node itself
    pub at: Option<String>,
    /// Address the slot before the node
    pub before: Option<String>,
    /// Address the slot after the node
    pub after: Option<String>,
    /// Address the node's children
    pub inside: Option<String>,
}

impl Locator {
    /// The whole view.
    #[must_use]
    pub fn whole() -> Self {
        Self::default()
    }

    /// Anchor `at` a node.
    #[must_use]
    pub fn at(selector: impl Into<String>) -> Self {
        Self { at: Some(selector.into()), ..Self::default() }
    }

    /// Anchor `before` a node.
    #[must_use]
    pub fn before(selector: impl Into<String>) -> Self {
        Self { before: Some(selector.into()), ..Self::default() }
    }

    /// Anchor `after` a node.
    #[must_use]
    pub fn after(selector: impl Into<String>) -> Self {
        Self { after: Some(selector.into()), ..Self::default() }
    }

    /// Anchor `inside` a node.
    #[must_use]
    pub fn inside(selector: impl Into<String>) -> Self {
        Self { inside: Some(selector.into()), ..Self::default() }
    }

    fn resolve(&self) -> Result<(Position, Option<Selector>), EditError> {
        let anchors = [
            ("at", Position::At, &self.at),
            ("before", Position::Before, &self.before),
            ("after", Position::After, &self.after),
            ("inside", Position::Inside, &self.inside),
        ];

        let mut chosen: Option<(&'static str, Position, &String)> = None;
        for (label, position, anchor) in anchors {
            let Some(selector) = anchor else { continue };
            if let Some((first, ..)) = chosen {
                return Err(EditError::Conflict { first, second: label });
            }
            chosen = Some((label, position, selector));
        }

        match chosen {
            None => Ok((Position::Inside, None)),
            Some((_, position, selector)) => Ok((position, Some(Selector::parse(selector)?))),
        }
    }
}

/// A selector-addressed mutation of the renderer's current view.
///
/// Wire form: `{t: kind, p: position, s?: selector}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Edit {
    /// Insert, update or remove
    #[serde(rename = "t")]
    pub kind: EditKind,

    /// Position relative to the selected node
    #[serde(rename = "p")]
    pub position: Position,

    /// Target node path; absent means the whole view
    #[serde(rename = "s", default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<Selector>,
}

impl Edit {
    /// Build an edit from a kind and anchor arguments.
    ///
    /// # Errors
    ///
    /// - `EditError::Conflict` if more than one anchor is set
    /// - `EditError::EmptySelector` if the anchor holds no names
    pub fn new(kind: EditKind, locator: &Locator) -> Result<Self, EditError> {
        let (position, selector) = locator.resolve()?;
        Ok(Self { kind, position, selector })
    }

    /// Replace the whole view (the implicit edit of every plain render).
    #[must_use]
    pub fn replace_all() -> Self {
        Self::default()
    }

    /// Whether this is the implicit whole-view update.
    #[must_use]
    pub fn is_replace_all(&self) -> bool {
        *self == Self::replace_all()
    }

    /// Apply this edit to a renderer-side view.
    ///
    /// `view` is the list of top-level items currently shown; `content` is
    /// what the accompanying `Output` carries. Remove edits ignore `content`.
    ///
    /// | position | Update                | Insert               | Remove             |
    /// |----------|-----------------------|----------------------|--------------------|
    /// | Inside   | replace children      | append to children   | clear children     |
    /// | At       | replace the node      | insert at its index  | remove the node    |
    /// | Before   | replace prev sibling  | insert before it     | remove prev sibling|
    /// | After    | replace next sibling  | insert after it      | remove next sibling|
    ///
    /// Without a selector the view itself plays the role of "children".
    ///
    /// # Errors
    ///
    /// - `EditError::TargetNotFound` if the selector matches nothing
    /// - `EditError::NoSibling` if a Before/After Update or Remove has no
    ///   sibling in that direction
    pub fn apply(&self, view: &mut Vec<Item>, content: Vec<Item>) -> Result<(), EditError> {
        let Some(selector) = &self.selector else {
            splice_children(view, self.kind, content);
            return Ok(());
        };

        let path = locate(view, selector.path())
            .ok_or_else(|| EditError::TargetNotFound(selector.to_string()))?;
        let (index, parents) = path
            .split_last()
            .ok_or_else(|| EditError::TargetNotFound(selector.to_string()))?;
        let siblings = descend(view, parents)
            .ok_or_else(|| EditError::TargetNotFound(selector.to_string()))?;
        let index = *index;

        match self.position {
            Position::Inside => {
                let Some(Item::Node(target)) = siblings.get_mut(index) else {
                    return Err(EditError::TargetNotFound(selector.to_string()));
                };
                splice_children(target.items.get_or_insert_with(Vec::new), self.kind, content);
            },
            Position::At => match self.kind {
                EditKind::Update => {
                    siblings.splice(index..=index, content);
                },
                EditKind::Insert => {
                    siblings.splice(index..index, content);
                },
                EditKind::Remove => {
                    siblings.remove(index);
                },
            },
            Position::Before => match self.kind {
                EditKind::Insert => {
                    siblings.splice(index..index, content);
                },
                EditKind::Update | EditKind::Remove => {
                    let prev = index
                        .checked_sub(1)
                        .ok_or_else(|| EditError::NoSibling(selector.to_string()))?;
                    let replacement = if self.kind == EditKind::Update { content } else { vec![] };
                    siblings.splice(prev..=prev, replacement);
                },
            },
            Position::After => {
                let next = index + 1;
                match self.kind {
                    EditKind::Insert => {
                        siblings.splice(next..next, content);
                    },
                    EditKind::Update | EditKind::Remove => {
                        if next >= siblings.len() {
                            return Err(EditError::NoSibling(selector.to_string()));
                        }
                        let replacement =
                            if self.kind == EditKind::Update { content } else { vec![] };
                        siblings.splice(next..=next, replacement);
                    },
                }
            },
        }

        Ok(())
    }
}

fn splice_children(children: &mut Vec<Item>, kind: EditKind, content: Vec<Item>) {
    match kind {
        EditKind::Update => *children = content,
        EditKind::Insert => children.extend(content),
        EditKind::Remove => children.clear(),
    }
}

/// Index path to the first node matching `path`, depth-first.
///
/// The first name may match at any depth; each following name is searched
/// inside the previous match.
fn locate(items: &[Item], path: &[String]) -> Option<Vec<usize>> {
    let (first, rest) = path.split_first()?;

    for (i, item) in items.iter().enumerate() {
        let Item::Node(node) = item else { continue };
        let children = node.items.as_deref().unwrap_or(&[]);

        if node.name.as_deref() == Some(first.as_str()) {
            if rest.is_empty() {
                return Some(vec![i]);
            }
            if let Some(mut tail) = locate(children, rest) {
                tail.insert(0, i);
                return Some(tail);
            }
        }

        if let Some(mut tail) = locate(children, path) {
            tail.insert(0, i);
            return Some(tail);
        }
    }

    None
}

/// Sibling list reached by following `parents` from the top-level view.
fn descend<'a>(view: &'a mut Vec<Item>, parents: &[usize]) -> Option<&'a mut Vec<Item>> {
    let mut siblings = view;
    for index in parents {
        let Item::Node(node) = siblings.get_mut(*index)? else { return None };
        siblings = node.items.as_mut()?;
    }
    Some(siblings)
}

/// Names of the top-level nodes of `items`, for assertions and logs.
#[must_use]
pub fn names(items: &[Item]) -> Vec<Option<&str>> {
    items
        .iter()
        .map(|item| match item {
            Item::Node(node) => node.name.as_deref(),
            Item::Text(text) => Some(text.as_str()),
        })
        .collect()
}
