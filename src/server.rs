use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AppState;
use crate::backend::{ChatBackend, ChatRequest};
use crate::config::AppConfig;
use crate::session::{WidgetSession, WidgetStore};
use crate::ui::{render_page, render_widget};
use crate::widget::{Message, Skipped, WidgetStatus};

/// Form posts larger than this are rejected before reaching a handler.
const MAX_FORM_BYTES: usize = 64 * 1024;

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let backend = config.backend.build_backend()?;

    info!(
        name: "backend.config.loaded",
        endpoint = %backend.endpoint(),
        timeout_secs = config.backend.timeout_secs,
        debug = config.backend.debug,
        "Chat service configuration loaded"
    );

    let store = WidgetStore::new(
        config.backend.widget_options(),
        config.server.session_ttl(),
    );
    let state = AppState {
        store,
        backend: Arc::new(backend),
        assets: Arc::new(config.ui.clone()),
    };

    let app = build_router(state).nest_service("/static", ServeDir::new(&config.server.static_dir));

    let addr = config.server.address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the widget router around `state`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/widget/{id}", get(widget_handler))
        .route("/widget/{id}/submit", post(submit_handler))
        .route("/api/sessions", post(api_create_session))
        .route(
            "/api/sessions/{id}",
            get(api_get_session).delete(api_delete_session),
        )
        .route("/api/sessions/{id}/messages", get(api_get_messages))
        .layer(DefaultBodyLimit::max(MAX_FORM_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// HTML Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Query string accepted by the page route.
#[derive(Debug, Deserialize)]
struct PageQuery {
    session: Option<String>,
}

/// GET / - Page with the widget of `?session=`, or a new empty one.
async fn index_handler(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Html<String> {
    let session = match query.session.as_deref().and_then(|id| state.store.get(id)) {
        Some(session) => session,
        None => {
            let session = state.store.create();
            tracing::debug!(session_id = %session.id(), "Created page session");
            session
        }
    };

    let widget_html = session.with_widget(|widget| render_widget(session.id(), widget));
    Html(render_page(&state.assets, &widget_html))
}

/// GET /widget/:id - Current widget fragment (htmx refresh target).
async fn widget_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, StatusCode> {
    let session = find_session(&state.store, &id)?;
    Ok(Html(
        session.with_widget(|widget| render_widget(session.id(), widget)),
    ))
}

/// Form body posted by the widget.
#[derive(Debug, Deserialize)]
struct SubmitForm {
    #[serde(default)]
    message: String,
}

/// POST /widget/:id/submit - Start a send cycle.
///
/// htmx requests get the busy widget back while the outbound call runs in
/// the background; the fragment polls until the reply has been recorded.
/// Plain form posts wait for the reply and are redirected to the page.
async fn submit_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Form(form): Form<SubmitForm>,
) -> Result<Response, StatusCode> {
    let from_htmx = headers.contains_key("hx-request");
    let session = find_session(&state.store, &id)?;

    let (started, html) = session.with_widget(|widget| {
        widget.set_draft(form.message.clone());
        let started = widget.try_begin_submit(form.message);
        (started, render_widget(session.id(), widget))
    });

    let page = format!("/?session={id}");
    match started {
        Ok(request) => {
            tracing::info!(
                session_id = %id,
                message_length = request.message.len(),
                from_htmx,
                "Chat request dispatched"
            );
            let store = state.store.clone();
            let backend = Arc::clone(&state.backend);
            if !from_htmx {
                run_request(store, backend, id, request).await;
                return Ok(Redirect::to(&page).into_response());
            }
            tokio::spawn(run_request(store, backend, id, request));
        }
        Err(Skipped::Busy) => {
            tracing::debug!(session_id = %id, "Submit ignored, request already pending");
        }
        Err(reason) => {
            tracing::debug!(session_id = %id, reason = ?reason, "Submit ignored");
        }
    }

    if from_htmx {
        Ok(Html(html).into_response())
    } else {
        Ok(Redirect::to(&page).into_response())
    }
}

/// Send `request` once and record the outcome on the session, if it still exists.
async fn run_request(
    store: WidgetStore,
    backend: Arc<dyn ChatBackend>,
    session_id: String,
    request: ChatRequest,
) {
    let outcome = backend.send(&request).await;

    match store.get(&session_id) {
        Some(session) => {
            let result = session.with_widget(|widget| widget.complete(outcome));
            tracing::info!(session_id = %session_id, outcome = ?result, "Chat reply recorded");
        }
        None => {
            tracing::debug!(session_id = %session_id, "Session gone, reply discarded");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Session info for the JSON API.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    pub status: WidgetStatus,
    pub busy: bool,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
}

impl SessionInfo {
    fn from_session(session: &WidgetSession) -> Self {
        let (status, message_count) =
            session.with_widget(|widget| (widget.status(), widget.transcript().len()));
        Self {
            id: session.id().to_string(),
            status,
            busy: status == WidgetStatus::Busy,
            message_count,
            created_at: session.created_at(),
        }
    }
}

/// GET /health
async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

/// POST /api/sessions - Create a new page session.
async fn api_create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionInfo>) {
    let session = state.store.create();
    (StatusCode::CREATED, Json(SessionInfo::from_session(&session)))
}

/// GET /api/sessions/:id - Session details.
async fn api_get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionInfo>, StatusCode> {
    let session = find_session(&state.store, &id)?;
    Ok(Json(SessionInfo::from_session(&session)))
}

/// DELETE /api/sessions/:id - Tear the widget down.
async fn api_delete_session(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    match state.store.remove(&id) {
        Some(_) => {
            tracing::debug!(session_id = %id, "Page session removed");
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}

/// GET /api/sessions/:id/messages - Transcript in send order.
async fn api_get_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Message>>, StatusCode> {
    let session = find_session(&state.store, &id)?;
    Ok(Json(session.with_widget(|widget| widget.transcript().to_vec())))
}

fn find_session(store: &WidgetStore, id: &str) -> Result<WidgetSession, StatusCode> {
    store.get(id).ok_or_else(|| {
        tracing::debug!(session_id = %id, "Session not found");
        StatusCode::NOT_FOUND
    })
}
