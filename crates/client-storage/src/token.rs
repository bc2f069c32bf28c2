//! Typed access to the bearer token.

use crate::{DurableStorage, StorageKeys, StorageResult};
use parking_lot::Mutex;
use std::sync::Arc;

/// Shared handle to the persisted bearer token.
///
/// Clones point at the same backend. Compare-and-clear is serialized so a
/// late 401 for an old token can never erase a token stored by a newer login.
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn DurableStorage>,
    write_lock: Arc<Mutex<()>>,
}

impl TokenStore {
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        Self {
            storage,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Current token, if any. Empty strings count as absent.
    pub fn get(&self) -> StorageResult<Option<String>> {
        Ok(self
            .storage
            .get(StorageKeys::TOKEN)?
            .filter(|token| !token.is_empty()))
    }

    /// Whether a token is stored.
    pub fn is_present(&self) -> StorageResult<bool> {
        Ok(self.get()?.is_some())
    }

    /// Persist a token, replacing any previous one.
    pub fn set(&self, token: &str) -> StorageResult<()> {
        let _guard = self.write_lock.lock();
        self.storage.set(StorageKeys::TOKEN, token)
    }

    /// Remove the token. Returns whether one was stored.
    pub fn clear(&self) -> StorageResult<bool> {
        let _guard = self.write_lock.lock();
        self.storage.remove(StorageKeys::TOKEN)
    }

    /// Remove the token only if it is still `expected`.
    pub fn clear_if_matches(&self, expected: &str) -> StorageResult<bool> {
        let _guard = self.write_lock.lock();
        match self.storage.get(StorageKeys::TOKEN)? {
            Some(current) if current == expected => self.storage.remove(StorageKeys::TOKEN),
            _ => Ok(false),
        }
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").finish_non_exhaustive()
    }
}
