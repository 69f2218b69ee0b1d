//! Logging initialization for the portal binary.
//!
//! Wraps the observability package so every entry point configures logging
//! the same way: JSONL to the portal log file, plus stderr when asked.

use crate::Paths;
use observability::LogConfig;

/// Initialize logging for a portal service.
///
/// Falls back to stderr-only output when the log file cannot be opened, so a
/// read-only home directory never prevents startup.
pub fn init_logging(service_name: &str, level: &str, paths: &Paths, also_stderr: bool) {
    let config = LogConfig {
        service_name: service_name.into(),
        default_level: level.into(),
        log_path: Some(paths.log_file()),
        also_stderr,
    };

    if let Err(error) = observability::init_with_config(config) {
        let fallback = LogConfig {
            service_name: service_name.into(),
            default_level: level.into(),
            log_path: None,
            also_stderr: true,
        };
        match observability::init_without_file(fallback) {
            Ok(()) => tracing::warn!(%error, "log file unavailable, logging to stderr only"),
            Err(error) => eprintln!("failed to initialize logging: {error}"),
        }
    }
}
