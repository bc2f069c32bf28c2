//! Terminal stand-in for UI navigation.

use blog_api::{NavigationMode, Navigator, LOGIN_PATH};
use std::sync::atomic::{AtomicBool, Ordering};

/// Remembers whether anything asked to send the user to the login view,
/// so commands can tell the user to sign in again.
#[derive(Debug, Default)]
pub struct TerminalNavigator {
    sent_to_login: AtomicBool,
}

impl TerminalNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent_to_login(&self) -> bool {
        self.sent_to_login.load(Ordering::SeqCst)
    }

    /// Drop a recorded login redirect, e.g. after an explicit logout.
    pub fn forget_login_redirect(&self) {
        self.sent_to_login.store(false, Ordering::SeqCst);
    }
}

impl Navigator for TerminalNavigator {
    fn navigate(&self, path: &str, mode: NavigationMode) {
        tracing::debug!(path, ?mode, "Navigation requested");
        if path == LOGIN_PATH {
            self.sent_to_login.store(true, Ordering::SeqCst);
        }
    }
}
