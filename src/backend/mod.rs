//! External chat service collaborator.
//!
//! The service is opaque: one `POST` with `{ "message": ... }` in, a JSON
//! object with an `answer` out. Anything else that goes wrong is a
//! [`RequestFailed`].
//!
//! - [`types`]: request/response wire types
//! - [`client`]: the [`ChatBackend`] seam and its reqwest implementation
//! - [`error`]: the single failure kind

pub mod client;
pub mod error;
pub mod types;

pub use client::{ChatBackend, HttpChatBackend, resolve_endpoint};
pub use error::{BackendSetupError, RequestFailed};
pub use types::{ActionItem, ChatRequest, ChatResponse, Diagnostics, RequestDefaults};
