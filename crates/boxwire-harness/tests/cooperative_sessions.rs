//! End-to-end sessions in the cooperative discipline.
//!
//! Covers the handshake, client-initiated switches, error reporting and the
//! read timeout. Delegates are plain structs implementing `AsyncDelegate`.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use boxwire_core::{
    App, Route, SessionConfig, SessionError, UiError, View,
    cooperative::{AsyncDelegate, AsyncUi, route},
};
use boxwire_harness::{HarnessError, spawn};
use boxwire_proto::{
    Node, Value,
    payloads::{ErrorPayload, Join, Theme},
};

/// Asks for a name, then greets.
struct Ask;

#[async_trait]
impl AsyncDelegate for Ask {
    async fn run(&self, ui: &mut AsyncUi<'_>) -> Result<(), UiError> {
        let prompt = ui.tr("ask").to_string();
        let reply = ui.show(Node::text(prompt).value("")).await?;
        let greeting = format!("{} {}", ui.tr("hello"), reply.as_str().unwrap_or_default());
        ui.render(View::new(Node::text(greeting)).no_read()).await?;
        Ok(())
    }
}

/// Static page showing its route text.
struct Page(&'static str);

#[async_trait]
impl AsyncDelegate for Page {
    async fn run(&self, ui: &mut AsyncUi<'_>) -> Result<(), UiError> {
        ui.render(View::new(Node::text(self.0)).no_read()).await?;
        Ok(())
    }
}

/// Renders an edit with two anchors, which can never be sent.
struct BadEdit;

#[async_trait]
impl AsyncDelegate for BadEdit {
    async fn run(&self, ui: &mut AsyncUi<'_>) -> Result<(), UiError> {
        ui.render(View::new(Node::text("x")).at("a").before("b")).await?;
        Ok(())
    }
}

fn app() -> Arc<App<dyn AsyncDelegate>> {
    App::builder(route("ask", Ask))
        .title("Boxwire")
        .menu(Route::group("Pages", [route("about", Page("about")).text("About")]))
        .nav(route("help", Page("help")).icon("question"))
        .route(route("broken", BadEdit))
        .theme(Theme { accent_color: Some("teal".into()), ..Theme::default() })
        .locale("en", [("ask", "Name?"), ("hello", "Hello")])
        .locale("de", [("ask", "Name?"), ("hello", "Hallo")])
        .default_locale("en")
        .build()
        .expect("valid app")
}

fn config() -> SessionConfig {
    SessionConfig::default()
}

#[tokio::test]
async fn handshake_acknowledges_settings() {
    let (session, mut renderer) = spawn::cooperative(app(), config());
    renderer.join(Join::default().with_mode("web").with_locale("de-CH")).expect("join");

    let settings = renderer.expect_settings().await.expect("ack");
    assert_eq!(settings.title.as_deref(), Some("Boxwire"));
    assert_eq!(settings.mode.as_deref(), Some("web"));
    assert_eq!(settings.theme.and_then(|t| t.accent_color).as_deref(), Some("teal"));

    let menu = settings.menu.expect("menu");
    assert_eq!(menu[0].text.as_deref(), Some("Pages"));
    let pages = menu[0].options.as_ref().expect("submenu");
    assert_eq!(pages[0].value, Value::from("about"));
    assert_eq!(settings.nav.expect("nav")[0].icon.as_deref(), Some("question"));

    let table = settings.locale.expect("locale table");
    assert_eq!(table.get("hello").map(String::as_str), Some("Hallo"));

    renderer.expect_output().await.expect("root output");
    renderer.reply([Value::from("Ann")]).expect("input");
    let greeting = renderer.expect_output().await.expect("greeting");
    assert_eq!(greeting.root.text.as_deref(), Some("Hallo Ann"));

    renderer.close();
    assert_eq!(session.await.expect("task"), Ok(()));
}

#[tokio::test]
async fn join_names_the_entry_route() {
    let (session, mut renderer) = spawn::cooperative(app(), config());
    renderer.join(Join::at("about")).expect("join");
    renderer.expect_settings().await.expect("ack");

    let page = renderer.expect_output().await.expect("about");
    assert_eq!(page.root.text.as_deref(), Some("about"));

    renderer.close();
    assert_eq!(session.await.expect("task"), Ok(()));
}

#[tokio::test]
async fn unknown_entry_route_starts_at_root() {
    let (session, mut renderer) = spawn::cooperative(app(), config());
    renderer.join(Join::at("removed-in-v2")).expect("join");
    renderer.expect_settings().await.expect("ack");

    let page = renderer.expect_output().await.expect("root");
    assert_eq!(page.root.text.as_deref(), Some("Name?"));

    renderer.close();
    assert_eq!(session.await.expect("task"), Ok(()));
}

#[tokio::test]
async fn messages_before_join_are_rejected() {
    let (session, mut renderer) = spawn::cooperative(app(), config());
    renderer.reply([Value::from("early")]).expect("input");

    let err = renderer.expect_error().await.expect("error");
    assert_eq!(err.code, ErrorPayload::UNEXPECTED_MESSAGE);

    renderer.join(Join::default()).expect("join");
    renderer.expect_settings().await.expect("ack");
    renderer.expect_output().await.expect("root");

    renderer.close();
    assert_eq!(session.await.expect("task"), Ok(()));
}

#[tokio::test]
async fn client_switch_abandons_the_render() {
    let (session, mut renderer) = spawn::cooperative(app(), config());
    renderer.join(Join::default()).expect("join");
    renderer.expect_settings().await.expect("ack");
    renderer.expect_output().await.expect("question");

    renderer.switch("help").expect("switch");
    let page = renderer.expect_output().await.expect("help");
    assert_eq!(page.root.text.as_deref(), Some("help"));

    // Idle after the page returns; a menu click still switches.
    renderer.switch("about").expect("switch");
    let page = renderer.expect_output().await.expect("about");
    assert_eq!(page.root.text.as_deref(), Some("about"));

    renderer.close();
    assert_eq!(session.await.expect("task"), Ok(()));
}

#[tokio::test]
async fn switch_to_unknown_route_is_reported_and_render_repeats() {
    let (session, mut renderer) = spawn::cooperative(app(), config());
    renderer.join(Join::default()).expect("join");
    renderer.expect_settings().await.expect("ack");
    renderer.expect_output().await.expect("question");

    renderer.switch("nowhere").expect("switch");
    let err = renderer.expect_error().await.expect("error");
    assert_eq!(err.code, ErrorPayload::ROUTE_NOT_FOUND);

    let again = renderer.expect_output().await.expect("question again");
    assert_eq!(again.root.text.as_deref(), Some("Name?"));

    renderer.close();
    assert_eq!(session.await.expect("task"), Ok(()));
}

#[tokio::test]
async fn malformed_replies_exhaust_the_error_budget() {
    let config = SessionConfig { max_consecutive_errors: 2, ..config() };
    let (session, mut renderer) = spawn::cooperative(app(), config);
    renderer.join(Join::default()).expect("join");
    renderer.expect_settings().await.expect("ack");
    renderer.expect_output().await.expect("question");

    for _ in 0..2 {
        renderer.send_raw(&b"not a frame"[..]).expect("garbage");
        let err = renderer.expect_error().await.expect("error");
        assert_eq!(err.code, ErrorPayload::MALFORMED_MESSAGE);
        renderer.expect_output().await.expect("question again");
    }

    renderer.send_raw(&b"still not a frame"[..]).expect("garbage");
    assert_eq!(session.await.expect("task"), Err(SessionError::TooManyErrors { count: 3 }));
    assert_eq!(renderer.expect_closed().await, Ok(()));
}

#[tokio::test]
async fn invalid_edit_is_never_sent() {
    let config = SessionConfig { max_consecutive_errors: 1, ..config() };
    let (session, mut renderer) = spawn::cooperative(app(), config);
    renderer.join(Join::at("broken")).expect("join");
    renderer.expect_settings().await.expect("ack");

    let err = renderer.expect_error().await.expect("error");
    assert_eq!(err.code, ErrorPayload::INVALID_EDIT);

    assert_eq!(session.await.expect("task"), Err(SessionError::TooManyErrors { count: 2 }));
    assert_eq!(renderer.expect_closed().await, Ok(()));
}

#[tokio::test]
async fn renderer_error_ends_the_session() {
    let (session, mut renderer) = spawn::cooperative(app(), config());
    renderer.join(Join::default()).expect("join");
    renderer.expect_settings().await.expect("ack");
    renderer.expect_output().await.expect("question");

    renderer.send(ErrorPayload::new(500, "renderer crashed")).expect("error");
    assert_eq!(
        session.await.expect("task"),
        Err(SessionError::Remote { code: 500, text: "renderer crashed".into() })
    );
}

#[tokio::test(start_paused = true)]
async fn silent_renderer_times_out() {
    let config = SessionConfig { read_timeout: Some(Duration::from_secs(1)), ..config() };
    let (session, mut renderer) = spawn::cooperative(app(), config);
    renderer.join(Join::default()).expect("join");
    renderer.expect_settings().await.expect("ack");
    renderer.expect_output().await.expect("question");

    assert_eq!(renderer.recv().await, Err(HarnessError::Closed));
    assert_eq!(session.await.expect("task"), Ok(()));
}
