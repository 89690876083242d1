//! Render requests.
//!
//! A [`View`] is what a delegate hands to `render`: the nodes to show, how to
//! merge them into the renderer's current view, and whether to wait for the
//! user's reply. Anchor methods mirror [`Locator`]; setting more than one of
//! them is reported when the view is rendered, not when it is built.

use boxwire_proto::{
    Edit, EditKind, Locator, Node,
    payloads::Output,
};

use crate::error::UiError;

/// One render call's arguments.
#[derive(Debug, Clone)]
pub struct View {
    nodes: Vec<Node>,
    kind: EditKind,
    locator: Locator,
    read: bool,
}

impl View {
    /// Show a single node.
    #[must_use]
    pub fn new(node: Node) -> Self {
        Self::of([node])
    }

    /// Show several nodes, wrapped in one container node.
    #[must_use]
    pub fn of(nodes: impl IntoIterator<Item = Node>) -> Self {
        Self {
            nodes: nodes.into_iter().collect(),
            kind: EditKind::Update,
            locator: Locator::whole(),
            read: true,
        }
    }

    /// Show nothing; used with [`View::remove`].
    #[must_use]
    pub fn empty() -> Self {
        Self::of([])
    }

    /// Insert instead of replacing.
    #[must_use]
    pub fn insert(mut self) -> Self {
        self.kind = EditKind::Insert;
        self
    }

    /// Remove the addressed content. Implies [`View::no_read`].
    #[must_use]
    pub fn remove(mut self) -> Self {
        self.kind = EditKind::Remove;
        self.read = false;
        self
    }

    /// Address the node named by `selector`.
    #[must_use]
    pub fn at(mut self, selector: impl Into<String>) -> Self {
        self.locator.at = Some(selector.into());
        self
    }

    /// Address the slot before the node named by `selector`.
    #[must_use]
    pub fn before(mut self, selector: impl Into<String>) -> Self {
        self.locator.before = Some(selector.into());
        self
    }

    /// Address the slot after the node named by `selector`.
    #[must_use]
    pub fn after(mut self, selector: impl Into<String>) -> Self {
        self.locator.after = Some(selector.into());
        self
    }

    /// Address the children of the node named by `selector`.
    #[must_use]
    pub fn inside(mut self, selector: impl Into<String>) -> Self {
        self.locator.inside = Some(selector.into());
        self
    }

    /// Send without waiting for a reply.
    #[must_use]
    pub fn no_read(mut self) -> Self {
        self.read = false;
        self
    }

    /// Whether rendering waits for a reply.
    #[must_use]
    pub fn reads(&self) -> bool {
        self.read
    }

    /// Build the `Output` envelope.
    ///
    /// # Errors
    ///
    /// - `UiError::Edit` if the anchors conflict or a selector is blank
    /// - `UiError::Tree` if sibling nodes share a name
    pub fn into_output(self) -> Result<Output, UiError> {
        let edit = Edit::new(self.kind, &self.locator)?;

        let mut nodes = self.nodes;
        let root = if nodes.len() == 1 {
            nodes.pop().unwrap_or_default()
        } else {
            Node::group(nodes)
        };
        root.validate()?;

        Ok(Output::new(root).with_edit(edit))
    }
}

impl From<Node> for View {
    fn from(node: Node) -> Self {
        Self::new(node)
    }
}

#[cfg(test)]
mod tests {
    use boxwire_proto::{EditError, Item, Position};

    use super::*;

    #[test]
    fn single_node_is_sent_as_is() {
        let node = Node::text("hello");
        let id = node.id.clone();
        let output = View::new(node).into_output().expect("valid");
        assert_eq!(output.root.id, id);
        assert_eq!(output.edit, None);
    }

    #[test]
    fn several_nodes_are_wrapped() {
        let output =
            View::of([Node::text("a"), Node::text("b")]).into_output().expect("valid");
        let items = output.root.items.expect("wrapper items");
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[0], Item::Node(n) if n.text.as_deref() == Some("a")));
    }

    #[test]
    fn anchors_become_edits() {
        let output = View::new(Node::text("x")).insert().before("amber").into_output().expect("valid");
        let edit = output.edit.expect("edit");
        assert_eq!(edit.kind, EditKind::Insert);
        assert_eq!(edit.position, Position::Before);
    }

    #[test]
    fn conflicting_anchors_fail() {
        let err = View::new(Node::text("x")).at("a").before("b").into_output();
        assert!(matches!(err, Err(UiError::Edit(EditError::Conflict { .. }))));
    }

    #[test]
    fn duplicate_sibling_names_fail() {
        let err = View::of([Node::text("a").named("n"), Node::text("b").named("n")]).into_output();
        assert!(matches!(err, Err(UiError::Tree(_))));
    }

    #[test]
    fn remove_never_reads() {
        let view = View::empty().remove().at("amber");
        assert!(!view.reads());
        let edit = view.into_output().expect("valid").edit.expect("edit");
        assert_eq!(edit.kind, EditKind::Remove);
        assert_eq!(edit.position, Position::At);
    }
}
