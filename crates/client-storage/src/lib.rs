//! Durable client-side storage for the Quill client.
//!
//! This crate provides:
//! - The [`DurableStorage`] key/value trait the session layer depends on
//! - An in-memory backend for tests and throwaway sessions
//! - A JSON file backend that survives restarts
//! - [`TokenStore`], the typed API over the bearer token key

mod file;
mod keys;
mod memory;
mod token;
mod traits;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use token::TokenStore;
pub use traits::DurableStorage;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific failure
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
