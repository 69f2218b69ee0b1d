//! # Observability
//!
//! Logging setup for the auth portal.
//!
//! Services call [`init_with_config`] once at startup and use plain `tracing`
//! macros everywhere else. Events are written as JSON lines to a log file
//! (`~/.auth-portal/logs/portal.jsonl` by default), with an optional compact
//! stderr layer for interactive use. `RUST_LOG` overrides the default level.
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "auth-portal".into(),
//!     default_level: "debug".into(),
//!     also_stderr: true,
//!     ..Default::default()
//! })?;
//! tracing::info!("ready");
//! ```

mod writer;

pub use writer::LogFileWriter;

use std::io;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service, recorded on the startup event.
    pub service_name: String,

    /// Default level filter when `RUST_LOG` is not set.
    pub default_level: String,

    /// Log file path. Defaults to `~/.auth-portal/logs/portal.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Also emit human-readable logs to stderr.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Default JSONL log location under the user's home directory.
pub fn default_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".auth-portal").join("logs").join("portal.jsonl"))
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install the global subscriber.
///
/// Fails if the log file cannot be opened or a subscriber is already set.
pub fn init_with_config(config: LogConfig) -> io::Result<()> {
    let log_path = config.log_path.clone().or_else(default_log_path);
    install(&config, log_path)
}

/// Install the global subscriber with stderr output only.
pub fn init_without_file(config: LogConfig) -> io::Result<()> {
    let config = LogConfig {
        also_stderr: true,
        ..config
    };
    install(&config, None)
}

fn install(config: &LogConfig, log_path: Option<PathBuf>) -> io::Result<()> {
    let file_layer = match &log_path {
        Some(path) => {
            let writer = LogFileWriter::open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_target(true)
                    .with_writer(writer)
                    .with_filter(env_filter(&config.default_level)),
            )
        }
        None => None,
    };

    let stderr_layer = config.also_stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .compact()
            .with_writer(io::stderr)
            .with_filter(env_filter(&config.default_level))
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    tracing::info!(
        service = %config.service_name,
        pid = std::process::id(),
        log_path = ?log_path,
        "observability initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.service_name, "unknown");
        assert_eq!(config.default_level, "info");
        assert!(config.log_path.is_none());
        assert!(!config.also_stderr);
    }

    #[test]
    fn default_log_path_lives_under_portal_dir() {
        if let Some(path) = default_log_path() {
            assert!(path.ends_with(".auth-portal/logs/portal.jsonl"));
        }
    }
}
