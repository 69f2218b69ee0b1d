//! The uniform result every auth operation returns.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure categories surfaced to forms and views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthErrorCode {
    InvalidCredentials,
    EmailNotConfirmed,
    UserExists,
    SessionError,
    AuthError,
    Unknown,
}

impl AuthErrorCode {
    /// Wire name of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthErrorCode::EmailNotConfirmed => "EMAIL_NOT_CONFIRMED",
            AuthErrorCode::UserExists => "USER_EXISTS",
            AuthErrorCode::SessionError => "SESSION_ERROR",
            AuthErrorCode::AuthError => "AUTH_ERROR",
            AuthErrorCode::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for AuthErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the provider actually said, kept for logs and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderErrorDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
}

/// A failed auth operation: always a code and a displayable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct AuthFailure {
    pub code: AuthErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<ProviderErrorDetail>,
}

impl AuthFailure {
    /// Build a failure. An empty message is replaced so views always have text.
    pub fn new(code: AuthErrorCode, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            "Something went wrong. Please try again.".to_string()
        } else {
            message
        };
        Self {
            code,
            message,
            raw: None,
        }
    }

    /// Attach the provider's original error.
    pub fn with_raw(mut self, raw: ProviderErrorDetail) -> Self {
        self.raw = Some(raw);
        self
    }
}

/// Result of every auth operation.
pub type AuthResult<T> = Result<T, AuthFailure>;
