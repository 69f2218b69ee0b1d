//! Provider error types.

use thiserror::Error;

/// Error type for provider and transport failures.
///
/// These never leave the service boundary; [`crate::map_error`] turns them
/// into an [`crate::AuthFailure`].
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider answered with a non-success status
    #[error("{message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] portal_storage::StorageError),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// OAuth flow error
    #[error("OAuth error: {0}")]
    OAuth(String),

    /// Refresh retries exhausted
    #[error("Token refresh failed after {0} attempts")]
    RefreshExhausted(u32),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ProviderError {
    /// Classify a reqwest failure, separating timeouts from other transport errors.
    pub fn from_transport(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ProviderError::Timeout
        } else {
            ProviderError::Http(error)
        }
    }

    /// HTTP status reported by the provider, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Api { status, .. } => Some(*status),
            ProviderError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns true if this error is transient and the operation can be retried.
    ///
    /// Transient errors include:
    /// - Timeouts and connection failures
    /// - 5xx answers and rate limiting (429)
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Timeout => true,
            ProviderError::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                if let Some(status) = e.status() {
                    return status.is_server_error();
                }
                false
            }
            ProviderError::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns true if the provider says the session no longer exists.
    pub fn is_session_gone(&self) -> bool {
        matches!(self.status(), Some(401 | 403 | 404))
    }
}

/// Result type alias using ProviderError.
pub type ProviderResult<T> = Result<T, ProviderError>;
