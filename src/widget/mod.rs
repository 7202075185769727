//! The chat widget core.
//!
//! A widget owns a draft, an append-only transcript and a busy flag. It
//! knows nothing about HTML or HTTP servers; hosts render it (see
//! [`crate::ui`]) and drive its send cycle through a
//! [`ChatBackend`](crate::backend::ChatBackend).

mod chat;
mod message;

pub use chat::{
    ChatWidget, FALLBACK_ANSWER, REQUEST_FAILED_TEXT, Skipped, SubmitOutcome, WidgetOptions,
    WidgetStatus,
};
pub use message::{Message, Role};
