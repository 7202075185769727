//! Failure of a single outbound chat request.

use thiserror::Error;

/// The one error kind the widget knows about.
///
/// Variants only exist so logs can tell causes apart; the widget renders all
/// of them the same way.
#[derive(Error, Debug)]
pub enum RequestFailed {
    /// Connection refused, reset, DNS failure and friends.
    #[error("network error: {0}")]
    Network(String),

    /// No response within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The service answered with a non-2xx status.
    #[error("chat service returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The body was not a JSON object or its `answer` was not a string.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// The chat client could not be set up.
#[derive(Error, Debug)]
pub enum BackendSetupError {
    /// The configured chat URL does not parse.
    #[error("invalid chat service URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// reqwest refused the client configuration.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

impl From<reqwest::Error> for RequestFailed {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status {
                status: status.as_u16(),
            }
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RequestFailed {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}
