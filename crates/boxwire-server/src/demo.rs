//! Sample application served by the `boxwire-server` binary.
//!
//! Three pages: `home` asks for a name and offers the other two, `counter`
//! re-renders a number on every click, `notes` appends to a list with insert
//! edits. Each page exists once per discipline; the widget trees they render
//! are shared.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use boxwire_core::{
    App, AppBuilder, RegistryError, Reply, UiError, View,
    blocking::{self, Delegate, Ui},
    cooperative::{self, AsyncDelegate, AsyncUi},
};
use boxwire_proto::{Choice, Node, Value, payloads::Theme};

/// Route key of the landing page.
pub const HOME: &str = "home";
/// Route key of the counter page.
pub const COUNTER: &str = "counter";
/// Route key of the notes page.
pub const NOTES: &str = "notes";

/// Demo app for thread-per-session serving.
pub fn blocking() -> Result<Arc<App<dyn Delegate>>, RegistryError> {
    configure(App::builder(blocking::route(HOME, home)))
        .menu(blocking::route(COUNTER, counter).text("Counter").icon("plus"))
        .menu(blocking::route(NOTES, notes).text("Notes").icon("edit"))
        .build()
}

/// Demo app for cooperative serving.
pub fn cooperative() -> Result<Arc<App<dyn AsyncDelegate>>, RegistryError> {
    configure(App::builder(cooperative::route(HOME, Home)))
        .menu(cooperative::route(COUNTER, Counter).text("Counter").icon("plus"))
        .menu(cooperative::route(NOTES, Notes).text("Notes").icon("edit"))
        .build()
}

fn configure<D: ?Sized>(builder: AppBuilder<D>) -> AppBuilder<D> {
    builder
        .title("Boxwire demo")
        .caption("Server-driven UI over a byte stream")
        .theme(Theme {
            mode: Some("light".into()),
            accent_color: Some("#2a7ae2".into()),
            accent_color_name: Some("blue".into()),
            ..Theme::default()
        })
        .locale("en", [("ask", "What is your name?"), ("hello", "Hello"), ("last", "Last count")])
        .locale("de", [("ask", "Wie heißt du?"), ("hello", "Hallo"), ("last", "Letzter Stand")])
        .default_locale("en")
}

fn name_prompt(prompt: &str) -> Node {
    Node::text(prompt).named("name").value("")
}

fn page_picker(greeting: String) -> Node {
    Node::text(greeting)
        .named("pages")
        .mode("menu")
        .options([Choice::new(COUNTER).text("Counter"), Choice::new(NOTES).text("Notes")])
}

fn counter_view(count: i64) -> View {
    View::of([
        Node::text(count.to_string()).named("count"),
        Node::new()
            .named("actions")
            .mode("button")
            .options([Choice::new("inc").text("+1"), Choice::new("done").text("Done")]),
    ])
}

fn notes_page() -> View {
    View::of([Node::new().named("notes"), note_entry()])
}

fn note_entry() -> Node {
    Node::text("New note").named("entry").value("")
}

fn entered(reply: &Reply) -> Option<String> {
    let text = reply.as_str()?.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn greeting(hello: &str, name: &str, last: Option<(&str, &Value)>) -> String {
    match last {
        Some((label, count)) => format!("{hello}, {name}! {label}: {count}"),
        None => format!("{hello}, {name}!"),
    }
}

fn count_params(count: i64) -> BTreeMap<String, Value> {
    BTreeMap::from([("count".to_string(), Value::Int(count))])
}

fn home(ui: &mut Ui<'_>) -> Result<(), UiError> {
    let name = match ui.context().get("name").and_then(Value::as_str) {
        Some(name) => name.to_string(),
        None => {
            let prompt = ui.tr("ask").to_string();
            let name = entered(&ui.show(name_prompt(&prompt))?).unwrap_or_else(|| "stranger".into());
            ui.context_mut().insert("name", name.as_str());
            name
        },
    };

    let text = greeting(ui.tr("hello"), &name, ui.params().get("count").map(|c| (ui.tr("last"), c)));
    let choice = ui.show(page_picker(text))?;
    let target = choice.as_str().unwrap_or(COUNTER).to_string();
    match ui.jump(&target, BTreeMap::new())? {}
}

fn counter(ui: &mut Ui<'_>) -> Result<(), UiError> {
    let mut count = 0;
    loop {
        match ui.render(counter_view(count))?.as_str() {
            Some("inc") => count += 1,
            _ => match ui.jump(HOME, count_params(count))? {},
        }
    }
}

fn notes(ui: &mut Ui<'_>) -> Result<(), UiError> {
    let mut reply = ui.render(notes_page())?;
    while let Some(text) = entered(&reply) {
        ui.render(View::new(Node::text(text)).insert().inside("notes").no_read())?;
        reply = ui.render(View::new(note_entry()).at("entry"))?;
    }
    match ui.jump(HOME, BTreeMap::new())? {}
}

struct Home;

#[async_trait]
impl AsyncDelegate for Home {
    async fn run(&self, ui: &mut AsyncUi<'_>) -> Result<(), UiError> {
        let name = match ui.context().get("name").and_then(Value::as_str) {
            Some(name) => name.to_string(),
            None => {
                let prompt = ui.tr("ask").to_string();
                let reply = ui.show(name_prompt(&prompt)).await?;
                let name = entered(&reply).unwrap_or_else(|| "stranger".into());
                ui.context_mut().insert("name", name.as_str());
                name
            },
        };

        let last = ui.params().get("count").map(|c| (ui.tr("last"), c));
        let text = greeting(ui.tr("hello"), &name, last);
        let choice = ui.show(page_picker(text)).await?;
        let target = choice.as_str().unwrap_or(COUNTER).to_string();
        match ui.jump(&target, BTreeMap::new()).await? {}
    }
}

struct Counter;

#[async_trait]
impl AsyncDelegate for Counter {
    async fn run(&self, ui: &mut AsyncUi<'_>) -> Result<(), UiError> {
        let mut count = 0;
        loop {
            let reply = ui.render(counter_view(count)).await?;
            if reply.as_str() == Some("inc") {
                count += 1;
            } else {
                match ui.jump(HOME, count_params(count)).await? {}
            }
        }
    }
}

struct Notes;

#[async_trait]
impl AsyncDelegate for Notes {
    async fn run(&self, ui: &mut AsyncUi<'_>) -> Result<(), UiError> {
        let mut reply = ui.render(notes_page()).await?;
        while let Some(text) = entered(&reply) {
            ui.render(View::new(Node::text(text)).insert().inside("notes").no_read()).await?;
            reply = ui.render(View::new(note_entry()).at("entry")).await?;
        }
        match ui.jump(HOME, BTreeMap::new()).await? {}
    }
}
