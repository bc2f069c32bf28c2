//! Session lifecycle state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐
//! │  Initializing   │ (initial)
//! └────────┬────────┘
//!          │ NoStoredToken ─────────────────────────────┐
//!          │ StoredTokenFound                           │
//!          ▼                                            │
//! ┌─────────────────┐  ProfileRejected                  │
//! │    Verifying    │ ──────────────────────┐           │
//! └────────┬────────┘                       ▼           ▼
//!          │ ProfileLoaded          ┌─────────────────────┐
//!          ▼                        │      SignedOut      │
//! ┌─────────────────┐               └─────────────────────┘
//! │    SignedIn     │ ◄── LoginCompleted (from any state)
//! └────────┬────────┘
//!          │ RefreshRequested ──► Refreshing ──► SignedIn / SignedOut
//!          │ LogoutRequested  ──► SigningOut ──► SignedOut (LogoutCompleted)
//!          │ SessionInvalidated ──► SignedOut
//! ```
//!
//! `LoginCompleted`, `LogoutRequested`, `RefreshRequested` and
//! `SessionInvalidated` are accepted in every state because the operations
//! that send them can be started at any time.

use rust_fsm::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(Initializing)

    Initializing => {
        NoStoredToken => SignedOut,
        StoredTokenFound => Verifying,
        LoginCompleted => SignedIn,
        LogoutRequested => SigningOut,
        RefreshRequested => Refreshing,
        SessionInvalidated => SignedOut
    },
    Verifying => {
        ProfileLoaded => SignedIn,
        ProfileRejected => SignedOut,
        LoginCompleted => SignedIn,
        LogoutRequested => SigningOut,
        RefreshRequested => Refreshing,
        SessionInvalidated => SignedOut
    },
    SignedOut => {
        LoginCompleted => SignedIn,
        LogoutRequested => SigningOut,
        RefreshRequested => Refreshing,
        SessionInvalidated => SignedOut
    },
    SignedIn => {
        LoginCompleted => SignedIn,
        LogoutRequested => SigningOut,
        RefreshRequested => Refreshing,
        SessionInvalidated => SignedOut
    },
    Refreshing => {
        ProfileLoaded => SignedIn,
        ProfileRejected => SignedOut,
        LoginCompleted => SignedIn,
        LogoutRequested => SigningOut,
        RefreshRequested => Refreshing,
        SessionInvalidated => SignedOut
    },
    SigningOut => {
        LogoutCompleted => SignedOut,
        LoginCompleted => SignedIn,
        LogoutRequested => SigningOut,
        RefreshRequested => Refreshing,
        SessionInvalidated => SignedOut
    }
}

pub use session_machine::Input as SessionMachineInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// Lifecycle phase of the session, for UI hints and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Created, initial check not started.
    Initializing,
    /// Checking a stored token against the backend.
    Verifying,
    /// No session.
    SignedOut,
    /// Session with a verified profile.
    SignedIn,
    /// Re-fetching the profile of an existing session.
    Refreshing,
    /// Local state cleared, backend notification in flight.
    SigningOut,
}

impl SessionPhase {
    /// Returns true while an operation is in progress.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SessionPhase::Initializing
                | SessionPhase::Verifying
                | SessionPhase::Refreshing
                | SessionPhase::SigningOut
        )
    }
}

impl From<&SessionMachineState> for SessionPhase {
    fn from(state: &SessionMachineState) -> Self {
        match state {
            SessionMachineState::Initializing => SessionPhase::Initializing,
            SessionMachineState::Verifying => SessionPhase::Verifying,
            SessionMachineState::SignedOut => SessionPhase::SignedOut,
            SessionMachineState::SignedIn => SessionPhase::SignedIn,
            SessionMachineState::Refreshing => SessionPhase::Refreshing,
            SessionMachineState::SigningOut => SessionPhase::SigningOut,
        }
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionPhase::Initializing => "initializing",
            SessionPhase::Verifying => "verifying",
            SessionPhase::SignedOut => "signed out",
            SessionPhase::SignedIn => "signed in",
            SessionPhase::Refreshing => "refreshing",
            SessionPhase::SigningOut => "signing out",
        };
        f.write_str(name)
    }
}

/// Retry behavior for the startup profile check.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Initial delay between retries in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 500,
            max_delay_ms: 5000,
        }
    }
}

impl RetryConfig {
    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms = self
            .initial_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        Duration::from_millis(delay_ms.min(self.max_delay_ms))
    }
}
