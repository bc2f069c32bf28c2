//! Session error types.

use blog_api::ApiError;
use client_storage::StorageError;
use thiserror::Error;

/// Error returned by session operations that report failures.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Backend call failed
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Token storage failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Invalid state transition in the session FSM
    #[error("Invalid session state transition: {0}")]
    InvalidStateTransition(String),
}

impl SessionError {
    /// Returns true if retrying the operation may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SessionError::Api(e) => e.is_transient(),
            _ => false,
        }
    }

    /// The backend error, if this failure came from a backend call.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            SessionError::Api(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type alias using SessionError.
pub type SessionResult<T> = Result<T, SessionError>;
