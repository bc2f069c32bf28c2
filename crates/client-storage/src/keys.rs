//! Storage key constants.

/// Storage keys used by the client
pub struct StorageKeys;

impl StorageKeys {
    /// Bearer token issued by the backend on login/register
    pub const TOKEN: &'static str = "token";
}
