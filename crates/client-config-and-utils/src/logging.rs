//! Logging initialization for client binaries.
//!
//! Thin wrapper over the observability package so every binary in the
//! workspace configures tracing the same way.

use observability::LogConfig;
use std::path::PathBuf;

/// Initialize tracing for `service_name` with an optional JSONL file.
///
/// `RUST_LOG` still takes precedence over `level`.
pub fn init_logging_for_service(service_name: &str, level: &str, log_path: Option<PathBuf>) {
    observability::init_with_config(LogConfig {
        service_name: service_name.into(),
        default_level: parse_level(level).as_str().to_ascii_lowercase(),
        log_path,
        also_stderr: true,
    });
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
