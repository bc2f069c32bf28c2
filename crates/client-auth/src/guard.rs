//! Route guard for views that need a signed-in user.

use crate::store::{SessionSnapshot, SessionStore};
use blog_api::{NavigationMode, Navigator, User, LOGIN_PATH};
use std::sync::Arc;
use tracing::debug;

/// What a protected view should do for a given session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Startup check still running. Show a pending indicator.
    Pending,
    /// Not signed in. Go to `to`, replacing the history entry when `replace`.
    Redirect { to: &'static str, replace: bool },
    /// Signed in. Show the view.
    Render,
}

/// Decide access from a session snapshot.
pub fn evaluate(snapshot: &SessionSnapshot) -> GuardDecision {
    if snapshot.loading {
        GuardDecision::Pending
    } else if snapshot.authenticated() {
        GuardDecision::Render
    } else {
        GuardDecision::Redirect {
            to: LOGIN_PATH,
            replace: true,
        }
    }
}

/// Outcome of rendering through a guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guarded<T> {
    Pending,
    Redirected,
    Content(T),
}

impl<T> Guarded<T> {
    pub fn content(self) -> Option<T> {
        match self {
            Guarded::Content(content) => Some(content),
            _ => None,
        }
    }
}

/// Gate in front of a protected view.
#[derive(Clone)]
pub struct RouteGuard {
    store: SessionStore,
    navigator: Arc<dyn Navigator>,
}

impl RouteGuard {
    pub fn new(store: SessionStore, navigator: Arc<dyn Navigator>) -> Self {
        Self { store, navigator }
    }

    /// Evaluate the current state, performing the redirect if one is due.
    pub fn check(&self) -> GuardDecision {
        let decision = evaluate(&self.store.snapshot());
        self.follow(&decision);
        decision
    }

    /// Produce the protected content only when a user is signed in.
    pub fn render<T>(&self, content: impl FnOnce(&User) -> T) -> Guarded<T> {
        let snapshot = self.store.snapshot();
        let decision = evaluate(&snapshot);
        self.follow(&decision);
        match (decision, snapshot.user.as_ref()) {
            (GuardDecision::Render, Some(user)) => Guarded::Content(content(user)),
            (GuardDecision::Pending, _) => Guarded::Pending,
            _ => Guarded::Redirected,
        }
    }

    /// Watch the session while the view is mounted. Returns once access is
    /// lost (after redirecting) or when the store goes away.
    pub async fn enforce(&self) -> GuardDecision {
        let mut rx = self.store.subscribe();
        loop {
            let decision = evaluate(&rx.borrow_and_update());
            if matches!(decision, GuardDecision::Redirect { .. }) {
                self.follow(&decision);
                return decision;
            }
            if rx.changed().await.is_err() {
                return decision;
            }
        }
    }

    fn follow(&self, decision: &GuardDecision) {
        if let GuardDecision::Redirect { to, replace } = decision {
            debug!(to, "Guard redirecting");
            let mode = if *replace {
                NavigationMode::Replace
            } else {
                NavigationMode::Push
            };
            self.navigator.navigate(to, mode);
        }
    }
}
