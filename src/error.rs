//! Error types for the `livechart-rs` crate.
//!
//! All fallible operations in this crate return [`Result<T>`], which is an
//! alias for `std::result::Result<T, ChartError>`.
//!
//! [`ChartError`] covers:
//! - **API errors**: Structured `{error, message}` bodies from the chart backend
//! - **HTTP status errors**: Unexpected status codes with response body
//! - **HTTP transport errors**: Network, TLS, timeout failures
//! - **JSON errors**: Deserialization failures
//! - **URL errors**: Malformed URL construction
//! - **Invalid arguments**: Client-side validation errors
//!
//! Inside the chart engine none of these reach the user: fetch failures are
//! logged and the previous state is kept until the next timer tick.

use std::fmt;

/// Error response returned by the chart backend.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApiErrorBody {
    /// Short error category (e.g. "not_found").
    #[serde(default)]
    pub error: Option<String>,
    /// Human-readable description of the error.
    #[serde(default)]
    pub message: Option<String>,
}

impl fmt::Display for ApiErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}",
            self.error.as_deref().unwrap_or("error"),
            self.message.as_deref().unwrap_or("No message"),
        )
    }
}

/// All possible errors produced by the chart client and engine.
#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    /// An error response returned by the chart backend.
    #[error("API error: {0}")]
    Api(ApiErrorBody),

    /// The server returned an unexpected HTTP status code.
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// The HTTP status code.
        status: reqwest::StatusCode,
        /// The response body text.
        body: String,
    },

    /// A network or transport-level error from `reqwest`.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to deserialize a JSON response body.
    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// An error building or parsing a URL.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// The caller provided an invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ChartError>;
