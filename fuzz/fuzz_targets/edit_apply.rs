//! Fuzz target for Edit::apply
//!
//! Builds a small named tree, then applies a sequence of arbitrary edits the
//! way a renderer would. Every edit either applies or fails with an
//! `EditError`; none may panic or corrupt the tree.

#![no_main]

use arbitrary::Arbitrary;
use boxwire_proto::{Edit, EditKind, Item, Node, Position, Selector};
use libfuzzer_sys::fuzz_target;

const NAMES: [&str; 6] = ["a", "b", "c", "d", "e", "f"];

#[derive(Debug, Arbitrary)]
struct Op {
    kind: u8,
    position: u8,
    selector: Vec<u8>,
    content: Vec<u8>,
}

fn kind(byte: u8) -> EditKind {
    match byte % 3 {
        0 => EditKind::Update,
        1 => EditKind::Insert,
        _ => EditKind::Remove,
    }
}

fn position(byte: u8) -> Position {
    match byte % 4 {
        0 => Position::Inside,
        1 => Position::At,
        2 => Position::Before,
        _ => Position::After,
    }
}

fn name(byte: u8) -> &'static str {
    NAMES[usize::from(byte) % NAMES.len()]
}

fn selector(path: &[u8]) -> Option<Selector> {
    if path.is_empty() {
        return None;
    }
    let text: Vec<&str> = path.iter().take(3).map(|b| name(*b)).collect();
    Selector::parse(&text.join(" ")).ok()
}

fn count(items: &[Item]) -> usize {
    items
        .iter()
        .map(|item| match item {
            Item::Node(node) => 1 + node.items.as_deref().map_or(0, count),
            Item::Text(_) => 1,
        })
        .sum()
}

fuzz_target!(|ops: Vec<Op>| {
    let mut view: Vec<Item> = vec![Item::Node(
        Node::group([Node::text("1").named("a"), Node::text("2").named("b")]).named("c"),
    )];

    for op in ops.iter().take(32) {
        let edit =
            Edit { kind: kind(op.kind), position: position(op.position), selector: selector(&op.selector) };
        let content: Vec<Item> =
            op.content.iter().take(4).map(|b| Item::Node(Node::new().named(name(*b)))).collect();

        let _ = edit.apply(&mut view, content);
        assert!(count(&view) < 4096);
    }
});
