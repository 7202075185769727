//! PAMS chat widget
//!
//! A small HTML-first chat widget: the user types a message, it is posted
//! to an external chat service, and the answer is appended to the
//! transcript.
//!
//! # Architecture
//!
//! - **Widget**: synchronous `Idle → Busy → Idle` state machine
//! - **Backend**: one JSON `POST` per message, every failure collapsed into one error kind
//! - **Server**: Axum serving the page and htmx fragment endpoints, one widget per page session
//! - **UI**: server-rendered HTML + htmx, no client framework
//!
//! # Modules
//!
//! - [`widget`]: transcript, draft and busy flag
//! - [`backend`]: chat service client and wire types
//! - [`session`]: per-page widget storage
//! - [`ui`]: HTML rendering
//! - [`server`]: HTTP routes
//! - [`cli`]: one-shot command line front end

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod backend;
pub mod cli;
pub mod config;
pub mod server;
pub mod session;
pub mod ui;
pub mod widget;

use std::sync::Arc;

use backend::ChatBackend;
use session::WidgetStore;
use ui::PageAssets;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// One widget per page session.
    pub store: WidgetStore,
    /// Chat service client shared by every widget.
    pub backend: Arc<dyn ChatBackend>,
    /// Page title and asset locations.
    pub assets: Arc<PageAssets>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("sessions", &self.store.len())
            .field("assets", &self.assets)
            .finish()
    }
}
