//! The chat widget fragment.
//!
//! Rendered on full page loads and returned by every htmx request that
//! targets `#chat-widget`. While the widget is busy the fragment polls
//! itself until the reply has been recorded.

use std::fmt::Write as _;

use crate::widget::{ChatWidget, Message, Role};

use super::escape_html;

/// Submit button label while idle.
pub const SEND_LABEL: &str = "Send";

/// Submit button label while a request is outstanding.
pub const BUSY_LABEL: &str = "Sending…";

/// Delay between busy-state refreshes.
pub const POLL_DELAY_MS: u64 = 500;

impl Role {
    /// CSS classes for a message bubble.
    #[must_use]
    fn bubble_classes(self) -> &'static str {
        match self {
            Self::User => "ml-auto bg-primary text-white",
            Self::Assistant => "mr-auto bg-surfaceVariant text-textPrimary",
        }
    }
}

/// Render the widget owned by page session `session_id`.
#[must_use]
pub fn render_widget(session_id: &str, widget: &ChatWidget) -> String {
    let id = escape_html(session_id);
    let busy = widget.is_busy();

    let refresh = if busy {
        format!(
            r#" hx-get="/widget/{id}" hx-trigger="load delay:{POLL_DELAY_MS}ms" hx-swap="outerHTML""#
        )
    } else {
        String::new()
    };
    let disabled = if busy { " disabled" } else { "" };
    let label = if busy { BUSY_LABEL } else { SEND_LABEL };
    let status = widget.status().as_str();

    format!(
        r##"<section id="chat-widget" class="chat-widget flex flex-col h-full bg-surface md:rounded-3xl overflow-hidden" data-session-id="{id}" data-status="{status}" aria-busy="{busy}"{refresh}>
    <ol class="chat-transcript flex-1 overflow-y-auto flex flex-col gap-3 p-4" aria-live="polite" aria-label="Chat messages">
{transcript}    </ol>
    <form class="flex gap-2 md:gap-3 p-3 md:p-5 bg-surfaceContainer" method="post" action="/widget/{id}/submit" hx-post="/widget/{id}/submit" hx-target="#chat-widget" hx-swap="outerHTML">
        <textarea name="message" rows="1" placeholder="Type your message..." class="flex-1 px-4 py-3 rounded-xl bg-surface text-textPrimary resize-none"{disabled}>{draft}</textarea>
        <button type="submit" class="shrink-0 h-11 px-4 rounded-xl bg-primary text-white disabled:opacity-50"{disabled}>{label}</button>
    </form>
</section>"##,
        transcript = render_transcript(widget.transcript()),
        draft = escape_html(widget.draft()),
    )
}

fn render_transcript(messages: &[Message]) -> String {
    let mut out = String::new();
    for message in messages {
        let role = message.role();
        let _ = writeln!(
            out,
            r#"        <li class="chat-message max-w-[80%] px-4 py-2 rounded-2xl whitespace-pre-wrap {classes}" data-role="{role}">{text}{diagnostics}</li>"#,
            classes = role.bubble_classes(),
            role = role.as_str(),
            text = escape_html(message.text()),
            diagnostics = render_diagnostics(message),
        );
    }
    out
}

fn render_diagnostics(message: &Message) -> String {
    let Some(diagnostics) = message.diagnostics() else {
        return String::new();
    };
    let json = serde_json::to_string_pretty(diagnostics).unwrap_or_default();
    format!(
        r#"<details class="chat-diagnostics mt-2 text-xs text-textMuted"><summary>Diagnostics</summary><pre>{}</pre></details>"#,
        escape_html(&json)
    )
}
