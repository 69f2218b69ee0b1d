//! Configuration management for the portal.
//!
//! The provider URL and public API key are required. They may come from the
//! config file, but the environment always wins; if either is still missing
//! after both sources are read, startup fails.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Environment variable holding the provider project URL.
pub const SUPABASE_URL_ENV: &str = "SUPABASE_URL";

/// Environment variable holding the provider public (anon) API key.
pub const ANON_KEY_ENV: &str = "SUPABASE_ANON_KEY";

/// Environment variable overriding the log level.
pub const LOG_LEVEL_ENV: &str = "AUTH_PORTAL_LOG_LEVEL";

/// Environment variable setting where signup confirmation links land.
pub const EMAIL_REDIRECT_ENV: &str = "AUTH_PORTAL_EMAIL_REDIRECT_URL";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default local port receiving the OAuth redirect.
pub const DEFAULT_OAUTH_CALLBACK_PORT: u16 = 9876;

/// Default time to wait for the OAuth redirect, in seconds.
pub const DEFAULT_OAUTH_TIMEOUT_SECS: u64 = 120;

/// Default per-request timeout for provider calls, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Portal configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Provider project URL, e.g. `https://xyz.supabase.co`.
    #[serde(default)]
    pub supabase_url: String,
    /// Provider public API key (not a secret).
    #[serde(default)]
    pub supabase_anon_key: String,
    /// Local port the OAuth redirect lands on.
    #[serde(default = "default_oauth_callback_port")]
    pub oauth_callback_port: u16,
    /// How long to wait for the OAuth redirect.
    #[serde(default = "default_oauth_timeout_secs")]
    pub oauth_timeout_secs: u64,
    /// Timeout applied to every provider request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Page the signup confirmation link opens. The provider's site URL when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_redirect_url: Option<String>,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_oauth_callback_port() -> u16 {
    DEFAULT_OAUTH_CALLBACK_PORT
}

fn default_oauth_timeout_secs() -> u64 {
    DEFAULT_OAUTH_TIMEOUT_SECS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            oauth_callback_port: DEFAULT_OAUTH_CALLBACK_PORT,
            oauth_timeout_secs: DEFAULT_OAUTH_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            email_redirect_url: None,
        }
    }
}

impl Config {
    /// Load configuration from the config file (if any) and the process
    /// environment, then validate the required provider values.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        Self::load_with(paths, |name| std::env::var(name).ok())
    }

    /// Same as [`Config::load`] with an injectable environment lookup.
    pub fn load_with<F>(paths: &Paths, lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.apply_env(lookup);
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file without validation.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(url) = non_empty(SUPABASE_URL_ENV) {
            self.supabase_url = url;
        }
        if let Some(key) = non_empty(ANON_KEY_ENV) {
            self.supabase_anon_key = key;
        }
        if let Some(level) = non_empty(LOG_LEVEL_ENV) {
            self.log_level = level;
        }
        if let Some(url) = non_empty(EMAIL_REDIRECT_ENV) {
            self.email_redirect_url = Some(url);
        }
    }

    /// Check that both provider values are present, the URLs parse and the
    /// timeouts are non-zero.
    pub fn validate(&self) -> CoreResult<()> {
        if self.supabase_url.trim().is_empty() {
            return Err(CoreError::Config(format!(
                "Missing {} environment variable.",
                SUPABASE_URL_ENV
            )));
        }
        if self.supabase_anon_key.trim().is_empty() {
            return Err(CoreError::Config(format!(
                "Missing {} environment variable.",
                ANON_KEY_ENV
            )));
        }
        self.supabase_url()?;
        if let Some(url) = &self.email_redirect_url {
            Url::parse(url)?;
        }
        if self.request_timeout_secs == 0 {
            return Err(CoreError::Config(
                "request_timeout_secs must be greater than zero.".to_string(),
            ));
        }
        if self.oauth_timeout_secs == 0 {
            return Err(CoreError::Config(
                "oauth_timeout_secs must be greater than zero.".to_string(),
            ));
        }
        Ok(())
    }

    /// Provider URL as a parsed URL.
    pub fn supabase_url(&self) -> CoreResult<Url> {
        Url::parse(self.supabase_url.trim_end_matches('/')).map_err(CoreError::from)
    }

    /// Provider URL without a trailing slash, for path joining.
    pub fn api_base(&self) -> &str {
        self.supabase_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    /// Load with no config file present.
    fn from_env(pairs: &[(&str, &str)]) -> CoreResult<Config> {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        Config::load_with(&paths, env(pairs))
    }

    fn write_config_file(paths: &Paths, json: &str) {
        paths.ensure_dirs().unwrap();
        std::fs::write(paths.config_file(), json).unwrap();
    }

    #[test]
    fn test_from_env_reads_required_values() {
        let config = from_env(&[
            (SUPABASE_URL_ENV, "https://abc.supabase.co/"),
            (ANON_KEY_ENV, "anon-key"),
        ])
        .unwrap();

        assert_eq!(config.api_base(), "https://abc.supabase.co");
        assert_eq!(config.supabase_anon_key, "anon-key");
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn test_missing_url_is_fatal() {
        let err = from_env(&[(ANON_KEY_ENV, "anon-key")]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing SUPABASE_URL environment variable."
        );
    }

    #[test]
    fn test_missing_anon_key_is_fatal() {
        let err = from_env(&[(SUPABASE_URL_ENV, "https://abc.supabase.co")])
            .unwrap_err();
        assert!(matches!(err, CoreError::Config(msg) if msg.contains(ANON_KEY_ENV)));
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let result = from_env(&[
            (SUPABASE_URL_ENV, "   "),
            (ANON_KEY_ENV, "anon-key"),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let result = from_env(&[
            (SUPABASE_URL_ENV, "not a url"),
            (ANON_KEY_ENV, "anon-key"),
        ]);
        assert!(matches!(result, Err(CoreError::InvalidUrl(_))));
    }

    #[test]
    fn test_env_overrides_config_file() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        write_config_file(
            &paths,
            r#"{
                "supabase_url": "https://file.supabase.co",
                "supabase_anon_key": "file-key",
                "log_level": "debug",
                "oauth_callback_port": 4000
            }"#,
        );

        let loaded = Config::load_with(
            &paths,
            env(&[(SUPABASE_URL_ENV, "https://env.supabase.co")]),
        )
        .unwrap();

        assert_eq!(loaded.supabase_url, "https://env.supabase.co");
        assert_eq!(loaded.supabase_anon_key, "file-key");
        assert_eq!(loaded.log_level, "debug");
        assert_eq!(loaded.oauth_callback_port, 4000);
        assert_eq!(loaded.email_redirect_url, None);
    }

    #[test]
    fn test_zero_timeouts_are_rejected() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        let required = [
            (SUPABASE_URL_ENV, "https://abc.supabase.co"),
            (ANON_KEY_ENV, "anon-key"),
        ];

        write_config_file(&paths, r#"{ "request_timeout_secs": 0 }"#);
        let err = Config::load_with(&paths, env(&required)).unwrap_err();
        assert!(matches!(err, CoreError::Config(msg) if msg.contains("request_timeout_secs")));

        write_config_file(&paths, r#"{ "oauth_timeout_secs": 0 }"#);
        let err = Config::load_with(&paths, env(&required)).unwrap_err();
        assert!(matches!(err, CoreError::Config(msg) if msg.contains("oauth_timeout_secs")));

        write_config_file(&paths, r#"{ "request_timeout_secs": 1 }"#);
        assert!(Config::load_with(&paths, env(&required)).is_ok());
    }

    #[test]
    fn test_email_redirect_from_env() {
        let config = from_env(&[
            (SUPABASE_URL_ENV, "https://abc.supabase.co"),
            (ANON_KEY_ENV, "anon-key"),
            (EMAIL_REDIRECT_ENV, "https://portal.example.com/login"),
        ])
        .unwrap();
        assert_eq!(
            config.email_redirect_url.as_deref(),
            Some("https://portal.example.com/login")
        );

        let invalid = from_env(&[
            (SUPABASE_URL_ENV, "https://abc.supabase.co"),
            (ANON_KEY_ENV, "anon-key"),
            (EMAIL_REDIRECT_ENV, "not a url"),
        ]);
        assert!(matches!(invalid, Err(CoreError::InvalidUrl(_))));
    }

    #[test]
    fn test_partial_config_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "log_level": "warn" }"#).unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.oauth_callback_port, DEFAULT_OAUTH_CALLBACK_PORT);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert!(config.supabase_url.is_empty());
    }

    #[test]
    fn test_load_without_file_or_env_fails() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        assert!(Config::load_with(&paths, |_| None).is_err());
    }
}
