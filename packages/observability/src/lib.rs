//! # Observability
//!
//! Shared tracing setup for the Quill client workspace.
//!
//! Crates are **log producers** only. They use the standard `tracing` macros
//! and never decide where output goes. Binaries call `observability::init()`
//! (or `init_with_config`) once at startup.
//!
//! ## Outputs
//!
//! - Compact human-readable lines on stderr.
//! - Optional structured JSONL written to a file. Enabled when
//!   [`LogConfig::log_path`] is set, or always with the `dev` feature
//!   (defaulting to `~/.quill/logs/client.jsonl`).
//!
//! ## Usage
//!
//! ```rust,ignore
//! fn main() {
//!     observability::init_with_config(observability::LogConfig {
//!         service_name: "cli".into(),
//!         default_level: "debug".into(),
//!         also_stderr: true,
//!         ..Default::default()
//!     });
//!     tracing::info!("ready");
//! }
//! ```

mod file;
mod json_layer;

pub use file::{default_log_path, CentralLogWriter};
pub use json_layer::{JsonLayer, LogEntry};

use std::io;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service (e.g., "cli", "tests").
    /// Included in every JSONL line for filtering.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by `RUST_LOG` environment variable.
    pub default_level: String,

    /// Optional JSONL log file path.
    pub log_path: Option<PathBuf>,

    /// Emit compact logs to stderr.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: true,
        }
    }
}

impl LogConfig {
    /// The JSONL path to write to, if file output is enabled.
    fn resolved_log_path(&self) -> Option<PathBuf> {
        if self.log_path.is_some() {
            return self.log_path.clone();
        }
        if cfg!(feature = "dev") {
            return default_log_path();
        }
        None
    }
}

/// Initialize tracing with default settings for the given service.
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    });
}

/// Initialize tracing with custom configuration.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_with_config(config: LogConfig) {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.default_level))
    };

    let json_layer = config.resolved_log_path().and_then(|path| {
        match CentralLogWriter::new(&path) {
            Ok(writer) => Some(
                JsonLayer::new(config.service_name.clone(), file::WriterFactory::new(writer))
                    .with_filter(filter()),
            ),
            Err(e) => {
                eprintln!("observability: cannot open {}: {}", path.display(), e);
                None
            }
        }
    });

    let stderr_layer = config.also_stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(io::stderr)
            .with_filter(filter())
    });

    let installed = tracing_subscriber::registry()
        .with(json_layer)
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(service = %config.service_name, "observability initialized");
    }
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};

/// Re-export Level for advanced filtering.
pub use tracing::Level;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.service_name, "unknown");
        assert_eq!(config.default_level, "info");
        assert!(config.log_path.is_none());
        assert!(config.also_stderr);
    }

    #[test]
    fn test_explicit_log_path_wins() {
        let config = LogConfig {
            log_path: Some(PathBuf::from("/tmp/quill-test.jsonl")),
            ..Default::default()
        };
        assert_eq!(
            config.resolved_log_path(),
            Some(PathBuf::from("/tmp/quill-test.jsonl"))
        );
    }

    #[cfg(not(feature = "dev"))]
    #[test]
    fn test_no_file_output_without_path() {
        assert!(LogConfig::default().resolved_log_path().is_none());
    }
}
