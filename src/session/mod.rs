//! Page session management.
//!
//! Each browser page gets its own [`ChatWidget`](crate::widget::ChatWidget),
//! held in memory and identified by UUID. Nothing is persisted: when a
//! session is removed or idles out, its transcript is gone.
//!
//! # Example
//!
//! ```rust
//! use pams_chat::session::WidgetStore;
//!
//! let store = WidgetStore::default();
//! let session = store.create();
//! session.with_widget(|widget| widget.set_draft("Hello!"));
//!
//! let draft = session.with_widget(|widget| widget.draft().to_string());
//! assert_eq!(draft, "Hello!");
//! ```

mod store;

pub use store::{DEFAULT_SESSION_TTL, WidgetSession, WidgetStore};
