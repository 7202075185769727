//! Server-rendered HTML.
//!
//! The UI is plain HTML strings driven by htmx attributes; there is no
//! client-side framework. Every dynamic string goes through
//! [`escape_html`].
//!
//! # Structure
//!
//! - [`shell`]: full page document around the widget
//! - [`widget`]: the chat widget fragment

pub mod shell;
pub mod widget;

pub use shell::{PageAssets, render_page};
pub use widget::{BUSY_LABEL, SEND_LABEL, render_widget};

/// Escape text for use in element content and double-quoted attributes.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
