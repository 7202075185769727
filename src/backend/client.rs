//! HTTP client for the external chat service.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use super::error::{BackendSetupError, RequestFailed};
use super::types::{ChatRequest, ChatResponse};

/// Anything that can answer a chat request.
///
/// The widget only talks to this trait, so tests and the CLI can swap the
/// transport without touching widget state.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one request. Exactly one attempt, no retries.
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, RequestFailed>;
}

/// reqwest-backed [`ChatBackend`].
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use pams_chat::backend::{ChatBackend, ChatRequest, HttpChatBackend, RequestDefaults};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = HttpChatBackend::new("http://localhost:8000/chat", Duration::from_secs(30))?;
/// let reply = backend
///     .send(&ChatRequest::new("Hello!", false, &RequestDefaults::default()))
///     .await?;
/// println!("{:?}", reply.answer);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpChatBackend {
    endpoint: Url,
    http: reqwest::Client,
}

impl HttpChatBackend {
    /// Create a client posting to `endpoint` with a per-request timeout.
    pub fn new(endpoint: impl AsRef<str>, timeout: Duration) -> Result<Self, BackendSetupError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Self::with_client(endpoint, http)
    }

    /// Create a client with a custom reqwest client.
    pub fn with_client(
        endpoint: impl AsRef<str>,
        http: reqwest::Client,
    ) -> Result<Self, BackendSetupError> {
        let endpoint = Url::parse(endpoint.as_ref())?;
        Ok(Self { endpoint, http })
    }

    /// The URL requests are posted to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, RequestFailed> {
        tracing::debug!(
            endpoint = %self.endpoint,
            message_length = request.message.len(),
            debug = request.debug.unwrap_or(false),
            "Posting chat request"
        );

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RequestFailed::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let reply = parse_reply(&body)?;

        tracing::debug!(
            status = %status,
            has_answer = reply.answer.is_some(),
            "Chat service replied"
        );
        Ok(reply)
    }
}

/// Decode a reply body. Only a JSON object is a reply.
fn parse_reply(body: &[u8]) -> Result<ChatResponse, RequestFailed> {
    match serde_json::from_slice::<Value>(body)? {
        object @ Value::Object(_) => Ok(serde_json::from_value(object)?),
        other => Err(RequestFailed::Malformed(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Resolve the configured chat URL.
///
/// Absolute URLs are used as-is; relative paths such as `/chat` or
/// `/api/chat` are joined onto `base`.
pub fn resolve_endpoint(chat_url: &str, base: Option<&str>) -> Result<Url, url::ParseError> {
    match Url::parse(chat_url) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = Url::parse(base.unwrap_or("http://127.0.0.1:8000/"))?;
            base.join(chat_url)
        }
        Err(e) => Err(e),
    }
}
