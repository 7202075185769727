//! Transcript entries.

use serde::{Deserialize, Serialize};

use crate::backend::Diagnostics;

/// Who wrote a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Typed into the widget.
    User,
    /// Returned by the chat service, or the error placeholder.
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One immutable transcript entry.
///
/// Fields are private: once a message is in the transcript nothing can
/// change it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    role: Role,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    diagnostics: Option<Diagnostics>,
}

impl Message {
    pub(crate) fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            diagnostics: None,
        }
    }

    pub(crate) fn assistant(text: impl Into<String>, diagnostics: Option<Diagnostics>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            diagnostics,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Non-answer response fields, only kept when the widget runs in debug mode.
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        self.diagnostics.as_ref()
    }
}
