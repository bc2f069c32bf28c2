//! API error types.

use std::collections::BTreeMap;
use thiserror::Error;

/// Error returned by backend calls.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The backend answered 401. The adapter has already cleared the
    /// session token and redirected to the login view.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// Any other non-2xx answer, with the server's message and per-field
    /// validation errors when it sent them.
    #[error("HTTP {status}: {message}")]
    Status {
        status: u16,
        message: String,
        field_errors: BTreeMap<String, String>,
    },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Storage error while reading or clearing the token
    #[error("Storage error: {0}")]
    Storage(#[from] client_storage::StorageError),

    /// Timeout error
    #[error("Request timed out")]
    Timeout,

    /// The backend could not be reached
    #[error("Network unavailable")]
    NetworkUnavailable,
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_connect() {
            ApiError::NetworkUnavailable
        } else {
            ApiError::Http(e)
        }
    }
}

impl ApiError {
    /// Returns true if the failure is transient and the call can be retried.
    ///
    /// Transient errors include:
    /// - Network unavailable and timeouts
    /// - 5xx answers
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::NetworkUnavailable | ApiError::Timeout => true,
            ApiError::Status { status, .. } => *status >= 500,
            ApiError::Http(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }

    /// Returns true if the backend rejected the credentials or token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// Per-field validation messages, empty unless the server sent some.
    pub fn field_errors(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            ApiError::Status { field_errors, .. } if !field_errors.is_empty() => {
                Some(field_errors)
            }
            _ => None,
        }
    }
}

/// Result type alias using ApiError.
pub type ApiResult<T> = Result<T, ApiError>;
