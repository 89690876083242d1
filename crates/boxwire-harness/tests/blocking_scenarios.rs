//! End-to-end sessions in the thread-per-session discipline.
//!
//! Each test runs `blocking::serve` on its own thread against a scripted
//! renderer over the duplex bridge.

use std::collections::BTreeMap;

use boxwire_core::{
    App, Reply, SessionConfig, UiError, View,
    blocking::{Ui, route},
};
use boxwire_harness::{HarnessError, spawn};
use boxwire_proto::{
    Edit, EditKind, Item, Node, Opcode, Position, Selector, Value,
    payloads::{Input, InputEntry, Join, Settings},
};
use proptest::prelude::*;

fn greeting(text: String) -> View {
    View::new(Node::text(text)).no_read()
}

#[test]
fn single_input_returns_its_value() {
    let app = App::builder(route("ask", |ui: &mut Ui<'_>| {
        let reply = ui.show(Node::text("What is your name?").value("Boaty"))?;
        let name = reply.as_str().unwrap_or_default().to_string();
        ui.render(greeting(format!("Hello, {name}")))?;
        Ok(())
    }))
    .build()
    .expect("valid app");

    let (session, mut renderer) = spawn::blocking(app, SessionConfig::default());
    renderer.join(Join::default()).expect("join");
    renderer.expect_settings_blocking().expect("ack");

    let question = renderer.expect_output_blocking().expect("question");
    assert_eq!(question.root.text.as_deref(), Some("What is your name?"));
    assert_eq!(question.root.value, Some(Value::from("Boaty")));
    assert_eq!(question.edit, None);

    renderer.send(Input { inputs: vec![InputEntry(4, Value::from("Ann"))] }).expect("input");
    let answer = renderer.expect_output_blocking().expect("answer");
    assert_eq!(answer.root.text.as_deref(), Some("Hello, Ann"));

    renderer.close();
    assert_eq!(session.join().expect("session thread"), Ok(()));
}

#[test]
fn two_inputs_return_a_pair_in_order() {
    let app = App::builder(route("form", |ui: &mut Ui<'_>| {
        let reply = ui.render(View::of([
            Node::text("First").named("first").value(""),
            Node::text("Last").named("last").value(""),
        ]))?;
        let Reply::Many(values) = reply else {
            return Err(UiError::application("expected two values"));
        };
        let joined: Vec<String> = values.iter().map(ToString::to_string).collect();
        ui.render(greeting(joined.join(" ")))?;
        Ok(())
    }))
    .build()
    .expect("valid app");

    let (session, mut renderer) = spawn::blocking(app, SessionConfig::default());
    renderer.join(Join::default()).expect("join");
    renderer.expect_settings_blocking().expect("ack");
    renderer.expect_output_blocking().expect("form");

    renderer.reply([Value::from("Ada"), Value::from("Lovelace")]).expect("input");
    let answer = renderer.expect_output_blocking().expect("answer");
    assert_eq!(answer.root.text.as_deref(), Some("Ada Lovelace"));

    renderer.close();
    assert_eq!(session.join().expect("session thread"), Ok(()));
}

#[test]
fn jump_carries_context_and_params() {
    let app = App::builder(route("A", |ui: &mut Ui<'_>| {
        ui.context_mut().insert("user", "Ann");
        ui.jump("B", BTreeMap::from([("id".to_string(), Value::Int(7))]))?;
        ui.render(greeting("unreachable".into()))?;
        Ok(())
    }))
    .route(route("B", |ui: &mut Ui<'_>| {
        let user = ui.context().get("user").cloned().unwrap_or_default();
        let id = ui.params().get("id").cloned().unwrap_or_default();
        ui.render(greeting(format!("{user}#{id}")))?;
        Ok(())
    }))
    .build()
    .expect("valid app");

    let (session, mut renderer) = spawn::blocking(app, SessionConfig::default());
    renderer.join(Join::default()).expect("join");
    renderer.expect_settings_blocking().expect("ack");

    let request = renderer.ack_switch_blocking().expect("switch");
    assert_eq!(request.method, "B");
    assert_eq!(request.params.and_then(|p| p.get("id").cloned()), Some(Value::Int(7)));

    let output = renderer.expect_output_blocking().expect("B output");
    assert_eq!(output.root.text.as_deref(), Some("Ann#7"));

    renderer.close();
    assert_eq!(session.join().expect("session thread"), Ok(()));
}

#[test]
fn close_while_awaiting_input_sends_nothing_more() {
    let app = App::builder(route("ask", |ui: &mut Ui<'_>| {
        ui.show(Node::text("Still there?").value(""))?;
        ui.render(greeting("never sent".into()))?;
        Ok(())
    }))
    .build()
    .expect("valid app");

    let (session, mut renderer) = spawn::blocking(app, SessionConfig::default());
    renderer.join(Join::default()).expect("join");
    renderer.expect_settings_blocking().expect("ack");
    renderer.expect_output_blocking().expect("question");

    renderer.close();
    assert_eq!(session.join().expect("session thread"), Ok(()));
    assert_eq!(renderer.recv_blocking(), Err(HarnessError::Closed));
    assert_eq!(renderer.transcript(), &[Opcode::Set, Opcode::Output]);
}

#[test]
fn insert_before_named_node() {
    let app = App::builder(route("colors", |ui: &mut Ui<'_>| {
        let column = Node::group([
            Node::text("red").named("red"),
            Node::text("amber").named("amber"),
        ])
        .named("colA");
        ui.render(View::new(column).no_read())?;
        ui.render(View::new(Node::text("cyan").named("cyan")).insert().before("amber").no_read())?;
        Ok(())
    }))
    .build()
    .expect("valid app");

    let (session, mut renderer) = spawn::blocking(app, SessionConfig::default());
    renderer.join(Join::default()).expect("join");
    renderer.expect_settings_blocking().expect("ack");
    renderer.expect_output_blocking().expect("column");

    let output = renderer.expect_output_blocking().expect("edit");
    let selector: Selector = "amber".parse().expect("selector");
    assert_eq!(
        output.edit,
        Some(Edit { kind: EditKind::Insert, position: Position::Before, selector: Some(selector) })
    );

    let column = renderer.find("colA").expect("column");
    let names: Vec<Option<&str>> = column
        .items
        .iter()
        .flatten()
        .map(|item| match item {
            Item::Node(node) => node.name.as_deref(),
            Item::Text(text) => Some(text.as_str()),
        })
        .collect();
    assert_eq!(names, vec![Some("red"), Some("cyan"), Some("amber")]);

    renderer.close();
    assert_eq!(session.join().expect("session thread"), Ok(()));
}

#[test]
fn settings_push_is_fire_and_forget() {
    let app = App::builder(route("home", |ui: &mut Ui<'_>| {
        ui.push_settings(Settings::titled("Dashboard"))?;
        ui.render(greeting("ready".into()))?;
        Ok(())
    }))
    .title("Boot")
    .build()
    .expect("valid app");

    let (session, mut renderer) = spawn::blocking(app, SessionConfig::default());
    renderer.join(Join::default()).expect("join");
    renderer.expect_settings_blocking().expect("ack");
    let pushed = renderer.expect_settings_blocking().expect("push");
    assert_eq!(pushed.title.as_deref(), Some("Dashboard"));
    renderer.expect_output_blocking().expect("ready");

    let titles: Vec<Option<&str>> =
        renderer.settings_history().iter().map(|s| s.title.as_deref()).collect();
    assert_eq!(titles, vec![Some("Boot"), Some("Dashboard")]);

    renderer.close();
    assert_eq!(session.join().expect("session thread"), Ok(()));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn reply_arity_follows_input_count(words in prop::collection::vec("[a-z]{1,8}", 0..5)) {
        let fields = words.len();
        let app = App::builder(route("form", move |ui: &mut Ui<'_>| {
            let inputs = (0..fields).map(|i| Node::new().named(format!("f{i}")).value(""));
            let reply = ui.render(View::of(inputs))?;
            let summary = match reply {
                Reply::None => "none".to_string(),
                Reply::One(value) => format!("one:{value}"),
                Reply::Many(values) => format!("many:{}", values.len()),
            };
            ui.render(greeting(summary))?;
            Ok(())
        }))
        .build()
        .expect("valid app");

        let (session, mut renderer) = spawn::blocking(app, SessionConfig::default());
        renderer.join(Join::default()).expect("join");
        renderer.expect_settings_blocking().expect("ack");
        renderer.expect_output_blocking().expect("form");

        renderer.reply(words.iter().map(|w| Value::from(w.as_str()))).expect("input");
        let summary = renderer.expect_output_blocking().expect("summary");
        let expected = match words.as_slice() {
            [] => "none".to_string(),
            [only] => format!("one:{only}"),
            many => format!("many:{}", many.len()),
        };
        prop_assert_eq!(summary.root.text.as_deref(), Some(expected.as_str()));

        renderer.close();
        prop_assert_eq!(session.join().expect("session thread"), Ok(()));
    }
}
