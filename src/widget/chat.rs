//! The chat widget state machine.

use serde::{Deserialize, Serialize};

use crate::backend::{ChatBackend, ChatRequest, ChatResponse, RequestDefaults, RequestFailed};

use super::message::Message;

/// Shown when the service replies without a usable answer.
pub const FALLBACK_ANSWER: &str = "No answer was returned for this question.";

/// Shown for every failed request, whatever the cause.
pub const REQUEST_FAILED_TEXT: &str = "Sorry, something went wrong while contacting the assistant. Please try again.";

/// Per-widget settings.
#[derive(Debug, Clone, Default)]
pub struct WidgetOptions {
    /// Send `debug: true` and keep response diagnostics on assistant messages.
    pub debug: bool,
    /// Extra request fields sent with every message.
    pub defaults: RequestDefaults,
}

/// `Idle → Busy → Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetStatus {
    Idle,
    Busy,
}

impl WidgetStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Busy => "busy",
        }
    }
}

/// Why a submit or completion did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skipped {
    /// Draft was empty or whitespace.
    EmptyDraft,
    /// A request is already outstanding.
    Busy,
    /// A completion arrived with no request outstanding.
    Idle,
}

/// Result of one send cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing happened; no request was sent.
    Skipped(Skipped),
    /// The service answered (possibly with the fallback placeholder).
    Answered,
    /// The request failed and the error text was appended.
    Failed,
}

/// A chat widget: draft, transcript and busy flag.
///
/// The type is synchronous. The outbound call is split into
/// [`begin_submit`](Self::begin_submit), which hands back the request to
/// send, and [`complete`](Self::complete), which records the outcome. Hosts
/// that own the widget for the whole cycle can use [`submit`](Self::submit).
///
/// # Example
///
/// ```rust
/// use pams_chat::backend::{ChatResponse, RequestFailed};
/// use pams_chat::widget::{ChatWidget, Role, WidgetOptions};
///
/// let mut widget = ChatWidget::new(WidgetOptions::default());
/// let request = widget.begin_submit("What is the answer?").unwrap();
/// assert!(widget.is_busy());
/// assert_eq!(request.message, "What is the answer?");
///
/// widget.complete(Ok::<_, RequestFailed>(ChatResponse::with_answer("42")));
/// assert!(!widget.is_busy());
/// assert_eq!(widget.transcript()[1].role(), Role::Assistant);
/// assert_eq!(widget.transcript()[1].text(), "42");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChatWidget {
    options: WidgetOptions,
    transcript: Vec<Message>,
    draft: String,
    busy: bool,
}

impl ChatWidget {
    pub fn new(options: WidgetOptions) -> Self {
        Self {
            options,
            transcript: Vec::new(),
            draft: String::new(),
            busy: false,
        }
    }

    pub fn options(&self) -> &WidgetOptions {
        &self.options
    }

    /// Messages in send order.
    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Replace the draft text (what the input control currently shows).
    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn status(&self) -> WidgetStatus {
        if self.busy {
            WidgetStatus::Busy
        } else {
            WidgetStatus::Idle
        }
    }

    /// Start a send cycle for `text`.
    ///
    /// Returns `Err` without touching any state when `text` is blank or a
    /// request is already outstanding. Otherwise appends the user message,
    /// clears the draft, marks the widget busy and returns the request that
    /// must be sent exactly once.
    pub fn try_begin_submit(&mut self, text: impl Into<String>) -> Result<ChatRequest, Skipped> {
        let text = text.into();
        if self.busy {
            tracing::debug!(transcript_len = self.transcript.len(), "Submit ignored while busy");
            return Err(Skipped::Busy);
        }
        if text.trim().is_empty() {
            tracing::debug!(transcript_len = self.transcript.len(), "Submit ignored for empty draft");
            return Err(Skipped::EmptyDraft);
        }

        let request = ChatRequest::new(text.clone(), self.options.debug, &self.options.defaults);
        self.transcript.push(Message::user(text));
        self.draft.clear();
        self.busy = true;

        tracing::debug!(
            transcript_len = self.transcript.len(),
            busy = self.busy,
            "Widget entered busy state"
        );
        Ok(request)
    }

    /// [`try_begin_submit`](Self::try_begin_submit) without the reason.
    pub fn begin_submit(&mut self, text: impl Into<String>) -> Option<ChatRequest> {
        self.try_begin_submit(text).ok()
    }

    /// Record the outcome of the outstanding request and return to idle.
    ///
    /// A completion that arrives while idle is stale and ignored.
    pub fn complete(&mut self, outcome: Result<ChatResponse, RequestFailed>) -> SubmitOutcome {
        if !self.busy {
            tracing::debug!(transcript_len = self.transcript.len(), "Stale completion ignored");
            return SubmitOutcome::Skipped(Skipped::Idle);
        }

        let result = match outcome {
            Ok(response) => {
                let diagnostics = self.options.debug.then(|| response.diagnostics()).flatten();
                let text = match response.answer {
                    Some(answer) if !answer.trim().is_empty() => answer,
                    _ => FALLBACK_ANSWER.to_string(),
                };
                self.transcript.push(Message::assistant(text, diagnostics));
                SubmitOutcome::Answered
            }
            Err(err) => {
                tracing::warn!(error = %err, "Chat request failed");
                self.transcript
                    .push(Message::assistant(REQUEST_FAILED_TEXT, None));
                SubmitOutcome::Failed
            }
        };
        self.busy = false;

        tracing::debug!(
            transcript_len = self.transcript.len(),
            busy = self.busy,
            outcome = ?result,
            "Widget returned to idle"
        );
        result
    }

    /// Run a whole send cycle against `backend`.
    pub async fn submit(
        &mut self,
        text: impl Into<String>,
        backend: &dyn ChatBackend,
    ) -> SubmitOutcome {
        let request = match self.try_begin_submit(text) {
            Ok(request) => request,
            Err(reason) => return SubmitOutcome::Skipped(reason),
        };
        let outcome = backend.send(&request).await;
        self.complete(outcome)
    }

    /// Submit whatever is currently in the draft.
    pub async fn submit_draft(&mut self, backend: &dyn ChatBackend) -> SubmitOutcome {
        let text = self.draft.clone();
        self.submit(text, backend).await
    }
}
