//! Widget routes driven through the router, with a controllable backend.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::{Json, Router, routing::post};
use axum_test::TestServer;
use pams_chat::AppState;
use pams_chat::backend::{
    ChatBackend, ChatRequest, ChatResponse, HttpChatBackend, RequestFailed,
};
use pams_chat::server::{SessionInfo, build_router};
use pams_chat::session::WidgetStore;
use pams_chat::ui::{BUSY_LABEL, PageAssets, SEND_LABEL};
use pams_chat::widget::{REQUEST_FAILED_TEXT, WidgetOptions, WidgetStatus};
use serde_json::{Value, json};
use tokio::sync::Semaphore;

/// Backend whose replies are held until the test releases them.
struct GatedBackend {
    calls: AtomicUsize,
    gate: Semaphore,
    fail: bool,
}

impl GatedBackend {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            gate: Semaphore::new(0),
            fail,
        })
    }

    fn release(&self) {
        self.gate.add_permits(1);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatBackend for GatedBackend {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, RequestFailed> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _permit = self.gate.acquire().await.expect("gate closed");
        if self.fail {
            Err(RequestFailed::Network("connection refused".into()))
        } else if request.message.contains("meaning") {
            Ok(ChatResponse::with_answer("42"))
        } else {
            Ok(ChatResponse::default())
        }
    }
}

fn test_server(backend: Arc<dyn ChatBackend>) -> TestServer {
    let state = AppState {
        store: WidgetStore::default(),
        backend,
        assets: Arc::new(PageAssets::default()),
    };
    TestServer::new(build_router(state)).expect("Failed to build test server")
}

fn session_id_from(html: &str) -> String {
    let marker = "data-session-id=\"";
    let start = html.find(marker).expect("no session id in page") + marker.len();
    let end = html[start..].find('"').unwrap() + start;
    html[start..end].to_string()
}

async fn open_page(server: &TestServer) -> String {
    let response = server.get("/").await;
    response.assert_status_ok();
    session_id_from(&response.text())
}

/// Submit the way htmx does, getting the widget fragment back.
async fn submit(server: &TestServer, id: &str, message: &str) -> String {
    let response = server
        .post(&format!("/widget/{id}/submit"))
        .add_header("hx-request", "true")
        .form(&[("message", message)])
        .await;
    response.assert_status_ok();
    response.text()
}

async fn wait_until_idle(server: &TestServer, id: &str) -> SessionInfo {
    for _ in 0..200 {
        let info: SessionInfo = server.get(&format!("/api/sessions/{id}")).await.json();
        if !info.busy {
            return info;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("widget never returned to idle");
}

async fn messages(server: &TestServer, id: &str) -> Vec<Value> {
    server
        .get(&format!("/api/sessions/{id}/messages"))
        .await
        .json()
}

#[tokio::test]
async fn test_page_starts_idle_and_empty() {
    let server = test_server(GatedBackend::new(false));

    let id = open_page(&server).await;

    let info: SessionInfo = server.get(&format!("/api/sessions/{id}")).await.json();
    assert_eq!(info.status, WidgetStatus::Idle);
    assert_eq!(info.message_count, 0);
    assert!(messages(&server, &id).await.is_empty());
}

#[tokio::test]
async fn test_blank_submit_changes_nothing() {
    let backend = GatedBackend::new(false);
    let server = test_server(backend.clone());
    let id = open_page(&server).await;

    let html = submit(&server, &id, "   ").await;

    assert!(html.contains(r#"data-status="idle""#));
    assert!(messages(&server, &id).await.is_empty());
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_send_cycle_busy_then_answered() {
    let backend = GatedBackend::new(false);
    let server = test_server(backend.clone());
    let id = open_page(&server).await;

    let html = submit(&server, &id, "What is the meaning of life?").await;
    assert!(html.contains(r#"data-status="busy""#));
    assert!(html.contains(BUSY_LABEL));

    // A second submit while busy is swallowed.
    let html = submit(&server, &id, "Are you there?").await;
    assert!(html.contains(r#"data-status="busy""#));
    assert!(html.contains("Are you there?"), "draft is kept for a later retry");

    backend.release();
    let info = wait_until_idle(&server, &id).await;

    assert_eq!(backend.calls(), 1);
    assert_eq!(info.message_count, 2);
    assert_eq!(
        messages(&server, &id).await,
        vec![
            json!({ "role": "user", "text": "What is the meaning of life?" }),
            json!({ "role": "assistant", "text": "42" }),
        ]
    );

    let html = server.get(&format!("/widget/{id}")).await.text();
    assert!(html.contains(SEND_LABEL));
    assert!(html.contains(">42"));
}

#[tokio::test]
async fn test_failure_appends_error_text() {
    let backend = GatedBackend::new(true);
    let server = test_server(backend.clone());
    let id = open_page(&server).await;

    submit(&server, &id, "hello").await;
    backend.release();
    wait_until_idle(&server, &id).await;

    let transcript = messages(&server, &id).await;
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[1]["role"], "assistant");
    assert_eq!(transcript[1]["text"], REQUEST_FAILED_TEXT);

    // The user can retry by hand.
    let html = submit(&server, &id, "hello again").await;
    assert!(html.contains(r#"data-status="busy""#));
    backend.release();
    wait_until_idle(&server, &id).await;
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn test_teardown_discards_pending_reply() {
    let backend = GatedBackend::new(false);
    let server = test_server(backend.clone());
    let id = open_page(&server).await;

    submit(&server, &id, "What is the meaning of life?").await;
    server
        .delete(&format!("/api/sessions/{id}"))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    backend.release();
    tokio::time::sleep(Duration::from_millis(50)).await;

    server
        .get(&format!("/api/sessions/{id}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .delete(&format!("/api/sessions/{id}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_plain_form_post_redirects_back_to_page() {
    let backend = GatedBackend::new(false);
    let server = test_server(backend.clone());
    let id = open_page(&server).await;

    // The reply is released up front: a plain post waits for it.
    backend.release();
    let response = server
        .post(&format!("/widget/{id}/submit"))
        .form(&[("message", "What is the meaning of life?")])
        .await;

    response.assert_status(StatusCode::SEE_OTHER);
    let location = response.headers().get("location").unwrap().to_str().unwrap();
    assert_eq!(location, format!("/?session={id}"));
    assert_eq!(messages(&server, &id).await.len(), 2);

    let page = server.get(location).await.text();
    assert_eq!(session_id_from(&page), id);
    assert!(page.contains(r#"data-status="idle""#));
    assert!(page.contains(">42"));
}

#[tokio::test]
async fn test_page_with_unknown_session_starts_fresh() {
    let server = test_server(GatedBackend::new(false));

    let page = server.get("/?session=does-not-exist").await.text();

    assert_ne!(session_id_from(&page), "does-not-exist");
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let server = test_server(GatedBackend::new(false));

    server
        .get("/widget/does-not-exist")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .post("/widget/does-not-exist/submit")
        .form(&[("message", "hi")])
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let backend = GatedBackend::new(false);
    let server = test_server(backend.clone());

    let created = server.post("/api/sessions").await;
    created.assert_status(StatusCode::CREATED);
    let other: SessionInfo = created.json();
    let id = open_page(&server).await;

    submit(&server, &id, "What is the meaning of life?").await;
    backend.release();
    wait_until_idle(&server, &id).await;

    assert_eq!(messages(&server, &id).await.len(), 2);
    assert!(messages(&server, &other.id).await.is_empty());
}

#[tokio::test]
async fn test_health() {
    let server = test_server(GatedBackend::new(false));

    let body: Value = server.get("/health").await.json();
    assert_eq!(body, json!({ "ok": true }));
}

#[tokio::test]
async fn test_end_to_end_with_http_backend() {
    let service = Router::new().route(
        "/api/chat",
        post(|Json(body): Json<Value>| async move {
            let debug = body.get("debug").and_then(Value::as_bool).unwrap_or(false);
            Json(json!({
                "answer": "Il y a 3 ordres de travail ouverts.",
                "used": { "mode": "sql", "debug": debug }
            }))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, service).await.unwrap();
    });

    let backend =
        HttpChatBackend::new(format!("http://{addr}/api/chat"), Duration::from_secs(2)).unwrap();
    let state = AppState {
        store: WidgetStore::new(
            WidgetOptions {
                debug: true,
                ..WidgetOptions::default()
            },
            Duration::from_secs(60),
        ),
        backend: Arc::new(backend),
        assets: Arc::new(PageAssets::default()),
    };
    let server = TestServer::new(build_router(state)).unwrap();
    let id = open_page(&server).await;

    submit(&server, &id, "Combien d'ordres ouverts ?").await;
    wait_until_idle(&server, &id).await;

    let transcript = messages(&server, &id).await;
    assert_eq!(transcript[1]["text"], "Il y a 3 ordres de travail ouverts.");
    assert_eq!(transcript[1]["diagnostics"]["used"]["debug"], true);

    let html = server.get(&format!("/widget/{id}")).await.text();
    assert!(html.contains("chat-diagnostics"));
}
