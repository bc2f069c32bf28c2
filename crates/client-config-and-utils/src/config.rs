//! Configuration management for the client.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default backend base URL (can be overridden at compile time via QUILL_API_BASE_URL).
pub const DEFAULT_API_BASE_URL: &str = match option_env!("QUILL_API_BASE_URL") {
    Some(url) => url,
    None => "http://localhost:8080/api",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const ENV_LOG_LEVEL: &str = "QUILL_LOG_LEVEL";
const ENV_API_BASE_URL: &str = "QUILL_API_BASE_URL";

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Backend REST API base URL, without trailing slash.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Timeout applied to every backend request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            api_base_url: default_api_base_url(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load configuration from the config file, falling back to defaults.
    /// Environment variables win over file values.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Override values from environment lookups.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(log_level) = non_empty(ENV_LOG_LEVEL) {
            self.log_level = log_level;
        }
        if let Some(url) = non_empty(ENV_API_BASE_URL) {
            self.api_base_url = url.trim().to_string();
        }
    }

    fn validate(&self) -> CoreResult<()> {
        self.api_base_url()?;
        if self.request_timeout_secs == 0 {
            return Err(CoreError::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// The API base URL, parsed, with a trailing slash so relative joins keep the path prefix.
    pub fn api_base_url(&self) -> CoreResult<Url> {
        let trimmed = self.api_base_url.trim_end_matches('/');
        Url::parse(&format!("{}/", trimmed)).map_err(CoreError::from)
    }

    /// Request timeout as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
