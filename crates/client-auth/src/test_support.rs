//! Scripted gateway and fixtures shared by the crate's tests.

use crate::session_fsm::RetryConfig;
use crate::store::SessionStore;
use async_trait::async_trait;
use blog_api::{
    ApiError, ApiResult, AuthGateway, AuthResponse, LoginRequest, RegisterRequest, User,
};
use client_storage::{MemoryStorage, TokenStore};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;

pub(crate) fn user(id: &str, username: &str) -> User {
    User {
        id: id.to_string(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        full_name: Some(username.to_string()),
        bio: None,
        avatar_url: None,
    }
}

pub(crate) fn alice() -> User {
    user("1", "alice")
}

pub(crate) fn bob() -> User {
    user("2", "bob")
}

fn rejected() -> ApiError {
    ApiError::Unauthorized {
        message: "not scripted".to_string(),
    }
}

/// Gateway answering from queues of scripted results.
#[derive(Default)]
pub(crate) struct FakeGateway {
    profiles: Mutex<VecDeque<ApiResult<User>>>,
    logins: Mutex<VecDeque<ApiResult<AuthResponse>>>,
    registrations: Mutex<VecDeque<ApiResult<AuthResponse>>>,
    logouts: Mutex<VecDeque<ApiResult<()>>>,
    profile_gate: Mutex<Option<Arc<Notify>>>,
    logout_gate: Mutex<Option<Arc<Notify>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeGateway {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_profile(self, result: ApiResult<User>) -> Self {
        self.profiles.lock().push_back(result);
        self
    }

    pub(crate) fn with_login(self, result: ApiResult<AuthResponse>) -> Self {
        self.logins.lock().push_back(result);
        self
    }

    pub(crate) fn with_register(self, result: ApiResult<AuthResponse>) -> Self {
        self.registrations.lock().push_back(result);
        self
    }

    pub(crate) fn with_logout(self, result: ApiResult<()>) -> Self {
        self.logouts.lock().push_back(result);
        self
    }

    /// Make profile fetches wait until the returned handle is notified.
    pub(crate) fn hold_profile(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.profile_gate.lock() = Some(gate.clone());
        gate
    }

    /// Make logout calls wait until the returned handle is notified.
    pub(crate) fn hold_logout(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.logout_gate.lock() = Some(gate.clone());
        gate
    }

    /// Calls made so far, e.g. `"current_user"` or `"logout:tok-1"`.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl AuthGateway for FakeGateway {
    async fn login(&self, request: &LoginRequest) -> ApiResult<AuthResponse> {
        self.record(format!("login:{}", request.username_or_email));
        self.logins.lock().pop_front().unwrap_or_else(|| Err(rejected()))
    }

    async fn register(&self, request: &RegisterRequest) -> ApiResult<AuthResponse> {
        self.record(format!("register:{}", request.username));
        self.registrations
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(rejected()))
    }

    async fn logout(&self, token: &str) -> ApiResult<()> {
        self.record(format!("logout:{token}"));
        let gate = self.logout_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.logouts.lock().pop_front().unwrap_or(Ok(()))
    }

    async fn current_user(&self) -> ApiResult<User> {
        self.record("current_user".to_string());
        let gate = self.profile_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.profiles.lock().pop_front().unwrap_or_else(|| Err(rejected()))
    }
}

pub(crate) fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        initial_delay_ms: 1,
        max_delay_ms: 5,
    }
}

/// Store over an in-memory token store and the given gateway.
pub(crate) fn store_with(gateway: FakeGateway) -> (SessionStore, TokenStore, Arc<FakeGateway>) {
    let gateway = Arc::new(gateway);
    let tokens = TokenStore::new(Arc::new(MemoryStorage::new()));
    let store = SessionStore::with_retry_config(gateway.clone(), tokens.clone(), fast_retry());
    (store, tokens, gateway)
}
