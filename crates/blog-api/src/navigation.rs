//! Navigation seam between session logic and the UI layer.

use parking_lot::Mutex;

/// Path of the login view.
pub const LOGIN_PATH: &str = "/login";

/// How a navigation affects history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationMode {
    /// Add a new history entry.
    Push,
    /// Replace the current entry, so "back" does not return to it.
    Replace,
}

/// Something that can move the user to another view.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str, mode: NavigationMode);

    /// Navigate without leaving a history entry behind.
    fn replace(&self, path: &str) {
        self.navigate(path, NavigationMode::Replace);
    }
}

/// Navigator that records every request, for front ends that poll for
/// redirects after a call returns.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    history: Mutex<Vec<(String, NavigationMode)>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// All navigations so far, oldest first.
    pub fn history(&self) -> Vec<(String, NavigationMode)> {
        self.history.lock().clone()
    }

    /// Most recent navigation target.
    pub fn last_path(&self) -> Option<String> {
        self.history.lock().last().map(|(path, _)| path.clone())
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str, mode: NavigationMode) {
        tracing::debug!(path, ?mode, "Navigation requested");
        self.history.lock().push((path.to_string(), mode));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_records_replace_mode() {
        let nav = RecordingNavigator::new();
        nav.replace(LOGIN_PATH);
        nav.navigate("/posts", NavigationMode::Push);

        assert_eq!(
            nav.history(),
            vec![
                (LOGIN_PATH.to_string(), NavigationMode::Replace),
                ("/posts".to_string(), NavigationMode::Push),
            ]
        );
        assert_eq!(nav.last_path().as_deref(), Some("/posts"));
    }
}
