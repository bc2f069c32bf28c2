//! Session store: the single source of truth for who is signed in.
//!
//! A [`SessionStore`] is a cheap cloneable handle. Every clone sees the same
//! state, and every state change is published to subscribers through a
//! `tokio::sync::watch` channel.
//!
//! Async operations take a generation number when they start and only apply
//! their result if no newer operation has started since, so a slow startup
//! check can never overwrite a login that finished first.

use crate::error::{SessionError, SessionResult};
use crate::session_fsm::{
    RetryConfig, SessionMachine, SessionMachineInput, SessionPhase,
};
use blog_api::{ApiResult, AuthGateway, HttpClient, LoginRequest, RegisterRequest, User};
use client_storage::TokenStore;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    /// Profile of the signed-in user.
    pub user: Option<User>,
    /// True until the startup check settles.
    pub loading: bool,
    /// Why the last verification or refresh failed. Display only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl SessionSnapshot {
    /// A user is authenticated exactly when a verified profile is present.
    pub fn authenticated(&self) -> bool {
        self.user.is_some()
    }
}

struct SessionCore {
    machine: SessionMachine,
    user: Option<User>,
    loading: bool,
    generation: u64,
    initialized: bool,
    torn_down: bool,
    last_error: Option<String>,
}

impl SessionCore {
    fn new() -> Self {
        Self {
            machine: SessionMachine::new(),
            user: None,
            loading: true,
            generation: 0,
            initialized: false,
            torn_down: false,
            last_error: None,
        }
    }

    fn phase(&self) -> SessionPhase {
        SessionPhase::from(self.machine.state())
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase(),
            user: self.user.clone(),
            loading: self.loading,
            last_error: self.last_error.clone(),
        }
    }

    /// Start a new operation, superseding any in flight.
    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn is_current(&self, generation: u64) -> bool {
        !self.torn_down && self.generation == generation
    }

    fn transition(&mut self, input: SessionMachineInput) -> SessionResult<SessionPhase> {
        let old_phase = self.phase();

        self.machine.consume(&input).map_err(|_| {
            SessionError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                self.machine.state()
            ))
        })?;

        let new_phase = self.phase();
        if old_phase != new_phase {
            debug!(
                old_phase = ?old_phase,
                new_phase = ?new_phase,
                "Session phase transition"
            );
        }
        Ok(new_phase)
    }
}

struct StoreInner {
    gateway: Arc<dyn AuthGateway>,
    tokens: TokenStore,
    retry: RetryConfig,
    core: Mutex<SessionCore>,
    state_tx: watch::Sender<SessionSnapshot>,
}

impl StoreInner {
    /// Apply an FSM input. Every input is accepted in the states the
    /// operations can reach, so a rejection is only logged.
    fn transition(&self, core: &mut SessionCore, input: SessionMachineInput) {
        if let Err(e) = core.transition(input) {
            warn!(error = %e, "Ignoring session transition");
        }
    }

    fn publish(&self, core: &SessionCore) {
        self.state_tx.send_replace(core.snapshot());
    }

    /// Remove the stored token if it is still `token`.
    fn discard_token(&self, token: &str) {
        if let Err(e) = self.tokens.clear_if_matches(token) {
            warn!(error = %e, "Failed to remove stored token");
        }
    }
}

/// Handle to the session state. Clone to share.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

impl SessionStore {
    /// Create a store with the default startup retry policy.
    pub fn new(gateway: Arc<dyn AuthGateway>, tokens: TokenStore) -> Self {
        Self::with_retry_config(gateway, tokens, RetryConfig::default())
    }

    /// Create a store with a custom startup retry policy.
    pub fn with_retry_config(
        gateway: Arc<dyn AuthGateway>,
        tokens: TokenStore,
        retry: RetryConfig,
    ) -> Self {
        let core = SessionCore::new();
        let (state_tx, _) = watch::channel(core.snapshot());
        Self {
            inner: Arc::new(StoreInner {
                gateway,
                tokens,
                retry,
                core: Mutex::new(core),
                state_tx,
            }),
        }
    }

    /// Sign the session out whenever `http` sees a 401 that removed the
    /// stored token.
    pub fn attach_to(&self, http: &HttpClient) {
        let weak: Weak<StoreInner> = Arc::downgrade(&self.inner);
        http.on_unauthorized(Box::new(move |event| {
            if !event.token_cleared {
                debug!(path = %event.path, "401 for a token no longer in use");
                return;
            }
            if let Some(inner) = weak.upgrade() {
                SessionStore { inner }.invalidate("Session rejected by the server");
            }
        }));
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.core.lock().snapshot()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state_tx.subscribe()
    }

    pub fn phase(&self) -> SessionPhase {
        self.inner.core.lock().phase()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.core.lock().user.is_some()
    }

    pub fn current_user(&self) -> Option<User> {
        self.inner.core.lock().user.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.core.lock().loading
    }

    /// Wait until the startup check has settled and return that state.
    pub async fn settled(&self) -> SessionSnapshot {
        let mut rx = self.subscribe();
        let result = rx.wait_for(|snapshot| !snapshot.loading).await.map(|s| s.clone());
        match result {
            Ok(snapshot) => snapshot,
            Err(_) => self.snapshot(),
        }
    }

    /// Derive the session from durable storage.
    ///
    /// Runs once. Without a stored token the session settles signed out
    /// immediately. With one, the profile is fetched (retrying transient
    /// failures) and the session settles signed in, or signed out with the
    /// token removed. Never fails.
    pub async fn initialize(&self) {
        let (generation, token) = {
            let mut core = self.inner.core.lock();
            if core.initialized || core.torn_down {
                debug!("Session already initialized");
                return;
            }
            core.initialized = true;

            if core.phase() != SessionPhase::Initializing {
                debug!(phase = %core.phase(), "Session settled before startup check");
                return;
            }

            let token = match self.inner.tokens.get() {
                Ok(token) => token,
                Err(e) => {
                    warn!(error = %e, "Could not read stored token, starting signed out");
                    core.last_error = Some(e.to_string());
                    None
                }
            };

            let Some(token) = token else {
                self.inner.transition(&mut core, SessionMachineInput::NoStoredToken);
                core.user = None;
                core.loading = false;
                self.inner.publish(&core);
                info!("No stored session");
                return;
            };

            let generation = core.next_generation();
            self.inner
                .transition(&mut core, SessionMachineInput::StoredTokenFound);
            self.inner.publish(&core);
            (generation, token)
        };

        let result = self.fetch_profile_with_retry(generation).await;

        let mut core = self.inner.core.lock();
        if !core.is_current(generation) {
            debug!("Discarding superseded startup check");
            return;
        }

        match result {
            Ok(user) => {
                info!(user_id = %user.id, username = %user.username, "Stored session verified");
                self.inner
                    .transition(&mut core, SessionMachineInput::ProfileLoaded);
                core.user = Some(user);
                core.last_error = None;
            }
            Err(e) => {
                warn!(error = %e, "Stored session could not be verified, signing out");
                self.inner.discard_token(&token);
                self.inner
                    .transition(&mut core, SessionMachineInput::ProfileRejected);
                core.user = None;
                core.last_error = Some(e.to_string());
            }
        }
        core.loading = false;
        self.inner.publish(&core);
    }

    /// Run [`initialize`](Self::initialize) on the runtime. The task does
    /// not keep the store alive.
    pub fn spawn_initialize(&self) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            SessionStore { inner }.initialize().await;
        })
    }

    async fn fetch_profile_with_retry(&self, generation: u64) -> ApiResult<User> {
        let retry = &self.inner.retry;
        let max_attempts = retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            let error = match self.inner.gateway.current_user().await {
                Ok(user) => return Ok(user),
                Err(e) => e,
            };

            attempt += 1;
            if !error.is_transient() || attempt >= max_attempts {
                return Err(error);
            }
            if !self.inner.core.lock().is_current(generation) {
                return Err(error);
            }

            let delay = retry.delay_for_attempt(attempt - 1);
            debug!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Profile fetch failed with transient error, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Record a successful authentication. Persists the token and signs
    /// the session in without any network call.
    pub fn login(&self, token: &str, user: User) -> SessionResult<()> {
        self.inner.tokens.set(token)?;

        let mut core = self.inner.core.lock();
        // A logout or 401 that ran between the write and the lock owns the outcome.
        if self.inner.tokens.get().ok().flatten().as_deref() != Some(token) {
            debug!("Stored token replaced before sign-in was recorded");
            return Ok(());
        }

        core.next_generation();
        self.inner
            .transition(&mut core, SessionMachineInput::LoginCompleted);
        info!(user_id = %user.id, username = %user.username, "Signed in");
        core.user = Some(user);
        core.loading = false;
        core.last_error = None;
        self.inner.publish(&core);
        Ok(())
    }

    /// Sign out. Local state and the stored token are cleared before the
    /// backend is told, and a failed backend call changes nothing.
    pub async fn logout(&self) {
        let (generation, token) = {
            let mut core = self.inner.core.lock();
            let token = self.inner.tokens.get().unwrap_or_else(|e| {
                warn!(error = %e, "Could not read stored token during logout");
                None
            });
            if let Err(e) = self.inner.tokens.clear() {
                warn!(error = %e, "Failed to remove stored token");
            }

            let generation = core.next_generation();
            self.inner
                .transition(&mut core, SessionMachineInput::LogoutRequested);
            core.user = None;
            core.loading = false;
            core.last_error = None;
            self.inner.publish(&core);
            (generation, token)
        };

        if let Some(token) = token {
            if let Err(e) = self.inner.gateway.logout(&token).await {
                warn!(error = %e, "Backend logout failed, session cleared locally");
            }
        }

        let mut core = self.inner.core.lock();
        if core.is_current(generation) {
            self.inner
                .transition(&mut core, SessionMachineInput::LogoutCompleted);
            self.inner.publish(&core);
        }
        info!("Signed out");
    }

    /// Re-fetch the profile of the current session.
    ///
    /// Returns `None` without a network call when no token is stored. On
    /// failure the session is signed out and the token removed.
    pub async fn refresh(&self) -> Option<User> {
        let (generation, token) = {
            let mut core = self.inner.core.lock();
            if core.torn_down {
                return None;
            }
            let token = match self.inner.tokens.get() {
                Ok(Some(token)) => token,
                Ok(None) => {
                    debug!("No stored token, nothing to refresh");
                    return None;
                }
                Err(e) => {
                    warn!(error = %e, "Could not read stored token, skipping refresh");
                    return None;
                }
            };

            let generation = core.next_generation();
            self.inner
                .transition(&mut core, SessionMachineInput::RefreshRequested);
            self.inner.publish(&core);
            (generation, token)
        };

        let result = self.inner.gateway.current_user().await;

        let mut core = self.inner.core.lock();
        if !core.is_current(generation) {
            debug!("Discarding superseded refresh");
            return None;
        }

        let refreshed = match result {
            Ok(user) => {
                debug!(user_id = %user.id, "Profile refreshed");
                self.inner
                    .transition(&mut core, SessionMachineInput::ProfileLoaded);
                core.user = Some(user.clone());
                core.last_error = None;
                Some(user)
            }
            Err(e) => {
                warn!(error = %e, "Profile refresh failed, signing out");
                self.inner.discard_token(&token);
                self.inner
                    .transition(&mut core, SessionMachineInput::ProfileRejected);
                core.user = None;
                core.last_error = Some(e.to_string());
                None
            }
        };
        core.loading = false;
        self.inner.publish(&core);
        refreshed
    }

    /// Authenticate with credentials and sign the session in.
    pub async fn sign_in(&self, username_or_email: &str, password: &str) -> SessionResult<User> {
        let request = LoginRequest {
            username_or_email: username_or_email.to_string(),
            password: password.to_string(),
        };
        let response = self.inner.gateway.login(&request).await?;
        self.login(&response.token, response.user.clone())?;
        Ok(response.user)
    }

    /// Create an account and sign the session in.
    pub async fn register(&self, request: &RegisterRequest) -> SessionResult<User> {
        let response = self.inner.gateway.register(request).await?;
        self.login(&response.token, response.user.clone())?;
        Ok(response.user)
    }

    /// Stop applying results of operations still in flight.
    pub fn teardown(&self) {
        let mut core = self.inner.core.lock();
        core.torn_down = true;
        core.next_generation();
        debug!("Session store torn down");
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.core.lock().torn_down
    }

    /// Drop the session after the backend rejected its token. The token is
    /// already gone from storage at this point.
    pub(crate) fn invalidate(&self, reason: &str) {
        let mut core = self.inner.core.lock();
        if core.torn_down {
            return;
        }
        core.next_generation();
        self.inner
            .transition(&mut core, SessionMachineInput::SessionInvalidated);
        core.user = None;
        core.loading = false;
        core.last_error = Some(reason.to_string());
        self.inner.publish(&core);
        warn!(reason, "Session invalidated");
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.inner.core.lock();
        f.debug_struct("SessionStore")
            .field("phase", &core.phase())
            .field("authenticated", &core.user.is_some())
            .field("loading", &core.loading)
            .finish_non_exhaustive()
    }
}
