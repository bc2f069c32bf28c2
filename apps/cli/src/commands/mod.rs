//! CLI command implementations.

mod auth;
mod profile;

pub use auth::{login, logout, refresh, register, status, whoami};
pub use profile::{profile_password, profile_update};

use crate::navigator::TerminalNavigator;
use crate::output::{self, OutputFormat};
use anyhow::{Context, Result};
use blog_api::{ApiError, HttpClient, ProfileService, RemoteAuthGateway};
use client_auth::{SessionError, SessionStore};
use client_config_and_utils::{Config, Paths};
use client_storage::{FileStorage, TokenStore};
use std::io::{self, Write};
use std::sync::Arc;

/// Everything a command needs, wired once per invocation.
pub struct App {
    pub store: SessionStore,
    pub profiles: ProfileService,
    pub navigator: Arc<TerminalNavigator>,
    pub api_base_url: String,
}

impl App {
    pub fn open(config: &Config, paths: &Paths) -> Result<Self> {
        let storage = FileStorage::open(paths.storage_file())
            .with_context(|| format!("opening {}", paths.storage_file().display()))?;
        let tokens = TokenStore::new(Arc::new(storage));
        let navigator = Arc::new(TerminalNavigator::new());

        let http = HttpClient::with_timeout(
            config.api_base_url()?,
            tokens.clone(),
            navigator.clone(),
            config.request_timeout(),
        )?;
        let gateway = Arc::new(RemoteAuthGateway::new(http.clone()));
        let store = SessionStore::new(gateway, tokens);
        store.attach_to(&http);

        Ok(Self {
            store,
            profiles: ProfileService::new(http),
            navigator,
            api_base_url: config.api_base_url.clone(),
        })
    }

    /// Hint shown when a login redirect left the session signed out.
    pub fn sign_in_hint(&self) -> Option<&'static str> {
        (self.navigator.sent_to_login() && !self.store.is_authenticated())
            .then_some("Not signed in. Run `quill login` to sign in.")
    }

    /// Tell the user to sign in again if the run ended signed out after a redirect.
    pub fn finish(&self, format: &OutputFormat) {
        if let Some(hint) = self.sign_in_hint() {
            output::print_error(hint, format);
        }
    }
}

/// Read one trimmed line from stdin after printing `label`.
fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    Ok(value.trim().to_string())
}

/// Use `value` if given, otherwise prompt for it. Empty input is an error.
fn value_or_prompt(value: Option<String>, label: &str) -> Result<String> {
    let value = match value {
        Some(value) => value.trim().to_string(),
        None => prompt(label)?,
    };
    if value.is_empty() {
        anyhow::bail!("{} is required", label);
    }
    Ok(value)
}

fn password_prompt(label: &str) -> Result<String> {
    let password = rpassword::prompt_password(format!("{}: ", label))?;
    if password.is_empty() {
        anyhow::bail!("{} is required", label);
    }
    Ok(password)
}

/// Print a backend failure, including per-field validation messages.
fn report_api_error(context: &str, error: &ApiError, format: &OutputFormat) {
    match format {
        OutputFormat::Text => {
            eprintln!("Error: {}: {}", context, error);
            if let Some(fields) = error.field_errors() {
                for (field, message) in fields {
                    eprintln!("  {}: {}", field, message);
                }
            }
        }
        OutputFormat::Json => {
            let line = serde_json::json!({
                "status": "error",
                "message": format!("{}: {}", context, error),
                "errors": error.field_errors(),
            });
            eprintln!("{}", line);
        }
    }
}

fn report_session_error(context: &str, error: &SessionError, format: &OutputFormat) {
    match error.api_error() {
        Some(api_error) => report_api_error(context, api_error, format),
        None => output::print_error(&format!("{}: {}", context, error), format),
    }
}
