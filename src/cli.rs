//! One-shot command line front end.
//!
//! Drives a single widget through one send cycle and prints the result,
//! the same way the browser widget would show it.

use std::fmt::Write as _;

use crate::backend::ChatBackend;
use crate::config::{AppConfig, AskArgs};
use crate::widget::{ChatWidget, Message, Role, SubmitOutcome};

/// Number of sources listed in the report.
const MAX_SOURCES: usize = 5;

/// Send `args.message` through a fresh widget.
///
/// Returns the rendered report and whether the cycle ended with an answer.
pub async fn ask(config: &AppConfig, args: &AskArgs, backend: &dyn ChatBackend) -> (String, bool) {
    let mut widget = ChatWidget::new(config.backend.widget_options());
    widget.set_draft(args.message.clone());

    let outcome = widget.submit_draft(backend).await;
    tracing::debug!(outcome = ?outcome, "Ask finished");

    let answered = outcome == SubmitOutcome::Answered;
    let reply = widget
        .transcript()
        .iter()
        .rev()
        .find(|m| m.role() == Role::Assistant);
    let report = reply.map(format_reply).unwrap_or_default();
    (report, answered)
}

/// Format an assistant message: the answer, then diagnostics when present.
pub fn format_reply(message: &Message) -> String {
    let mut out = format!("ANSWER:\n{}\n", message.text());

    let Some(diagnostics) = message.diagnostics() else {
        return out;
    };
    if !diagnostics.used.is_empty() {
        let used = serde_json::to_string(&diagnostics.used).unwrap_or_default();
        let _ = write!(out, "\nUSED: {used}\n");
    }
    if !diagnostics.navigation.is_empty() {
        let nav = serde_json::to_string(&diagnostics.navigation).unwrap_or_default();
        let _ = write!(out, "\nNAV: {nav}\n");
    }
    if !diagnostics.sources.is_empty() {
        out.push_str("\nSOURCES:\n");
        for source in diagnostics.sources.iter().take(MAX_SOURCES) {
            let _ = writeln!(out, " - {source}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ChatResponse, RequestFailed};
    use crate::widget::WidgetOptions;
    use serde_json::json;

    fn reply(body: serde_json::Value, debug: bool) -> Message {
        let mut widget = ChatWidget::new(WidgetOptions {
            debug,
            ..WidgetOptions::default()
        });
        widget.begin_submit("q");
        widget.complete(Ok(serde_json::from_value::<ChatResponse>(body).unwrap()));
        widget.transcript()[1].clone()
    }

    #[test]
    fn plain_answer() {
        let message = reply(json!({ "answer": "42" }), false);
        assert_eq!(format_reply(&message), "ANSWER:\n42\n");
    }

    #[test]
    fn debug_answer_lists_diagnostics() {
        let sources: Vec<_> = (0..7).map(|i| json!({ "id": i })).collect();
        let message = reply(
            json!({
                "answer": "ok",
                "sources": sources,
                "navigation": [{ "type": "open_page", "payload": { "page": "assets" } }],
                "used": { "mode": "rag" }
            }),
            true,
        );
        let report = format_reply(&message);

        assert!(report.starts_with("ANSWER:\nok\n"));
        assert!(report.contains("USED: {\"mode\":\"rag\"}"));
        assert!(report.contains("NAV: [{\"type\":\"open_page\""));
        assert_eq!(report.matches(" - {\"id\":").count(), MAX_SOURCES);
    }

    #[test]
    fn failed_cycle_reports_error_text() {
        let mut widget = ChatWidget::default();
        widget.begin_submit("q");
        widget.complete(Err(RequestFailed::Timeout));
        let report = format_reply(&widget.transcript()[1]);
        assert!(report.contains(crate::widget::REQUEST_FAILED_TEXT));
    }
}
