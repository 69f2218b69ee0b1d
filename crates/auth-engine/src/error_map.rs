//! Translation of provider failures into [`AuthFailure`]s.
//!
//! Provider messages are matched case-insensitively by substring. Anything
//! that never reached the provider (network, timeout, undecodable body) is
//! reported as `UNKNOWN` with a fallback message for the operation.

use crate::result::{AuthErrorCode, AuthFailure, ProviderErrorDetail};
use crate::ProviderError;

/// The auth operations a failure can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOperation {
    SignUp,
    SignIn,
    SignOut,
    GetSession,
    GetUser,
    GoogleSignIn,
    ResendVerification,
}

impl AuthOperation {
    /// Message shown when the provider gave nothing usable.
    pub fn fallback_message(&self) -> &'static str {
        match self {
            AuthOperation::SignUp => "Sign up failed. Please try again.",
            AuthOperation::SignIn => "Login failed. Please try again.",
            AuthOperation::SignOut => "Logout failed. Please try again.",
            AuthOperation::GetSession | AuthOperation::GetUser => "Could not get session.",
            AuthOperation::GoogleSignIn => "Google sign-in failed. Please try again.",
            AuthOperation::ResendVerification => "Failed to resend. Please try again.",
        }
    }

    fn is_session_read(&self) -> bool {
        matches!(self, AuthOperation::GetSession | AuthOperation::GetUser)
    }
}

const MESSAGE_RULES: &[(&str, AuthErrorCode, &str)] = &[
    (
        "invalid login credentials",
        AuthErrorCode::InvalidCredentials,
        "Invalid email or password.",
    ),
    (
        "email not confirmed",
        AuthErrorCode::EmailNotConfirmed,
        "Please confirm your email before logging in.",
    ),
    (
        "user already registered",
        AuthErrorCode::UserExists,
        "An account with that email already exists.",
    ),
];

// GoTrue also sends a machine-readable `error_code`; used when the text is reworded.
const CODE_RULES: &[(&str, usize)] = &[
    ("invalid_credentials", 0),
    ("email_not_confirmed", 1),
    ("user_already_exists", 2),
];

/// Map a provider message to a code and the text to display.
pub fn map_provider_message(message: &str) -> (AuthErrorCode, String) {
    let lowered = message.to_lowercase();
    for (needle, code, text) in MESSAGE_RULES {
        if lowered.contains(needle) {
            return (*code, (*text).to_string());
        }
    }
    (AuthErrorCode::AuthError, message.to_string())
}

fn map_provider_code(code: &str) -> Option<(AuthErrorCode, String)> {
    CODE_RULES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(code))
        .map(|(_, index)| {
            let (_, code, text) = MESSAGE_RULES[*index];
            (code, text.to_string())
        })
}

/// Convert a provider error raised during `operation` into an [`AuthFailure`].
pub fn map_error(operation: AuthOperation, error: &ProviderError) -> AuthFailure {
    let fallback = operation.fallback_message();

    match error {
        ProviderError::Api {
            status,
            code,
            message,
        } => {
            let raw = ProviderErrorDetail {
                status: Some(*status),
                code: code.clone(),
                message: message.clone(),
            };

            let text = if message.trim().is_empty() {
                fallback.to_string()
            } else {
                message.clone()
            };

            if operation.is_session_read() {
                return AuthFailure::new(AuthErrorCode::SessionError, text).with_raw(raw);
            }

            let (mapped, display) = match map_provider_message(&text) {
                (AuthErrorCode::AuthError, _) => code
                    .as_deref()
                    .and_then(map_provider_code)
                    .unwrap_or((AuthErrorCode::AuthError, text)),
                matched => matched,
            };
            AuthFailure::new(mapped, display).with_raw(raw)
        }
        ProviderError::OAuth(message) => AuthFailure::new(AuthErrorCode::AuthError, message.clone()),
        ProviderError::RefreshExhausted(_) => {
            AuthFailure::new(AuthErrorCode::SessionError, error.to_string())
        }
        ProviderError::Storage(_) if operation.is_session_read() => {
            AuthFailure::new(AuthErrorCode::SessionError, fallback)
        }
        ProviderError::Http(_)
        | ProviderError::Json(_)
        | ProviderError::Storage(_)
        | ProviderError::InvalidUrl(_)
        | ProviderError::Timeout
        | ProviderError::Config(_) => AuthFailure::new(AuthErrorCode::Unknown, fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, code: Option<&str>, message: &str) -> ProviderError {
        ProviderError::Api {
            status,
            code: code.map(str::to_string),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_invalid_credentials_message() {
        let failure = map_error(
            AuthOperation::SignIn,
            &api(400, None, "Invalid login credentials"),
        );
        assert_eq!(failure.code, AuthErrorCode::InvalidCredentials);
        assert_eq!(failure.message, "Invalid email or password.");
        assert_eq!(failure.raw.unwrap().message, "Invalid login credentials");
    }

    #[test]
    fn test_matching_ignores_case_and_surrounding_text() {
        let (code, text) = map_provider_message("AuthApiError: EMAIL NOT CONFIRMED yet");
        assert_eq!(code, AuthErrorCode::EmailNotConfirmed);
        assert_eq!(text, "Please confirm your email before logging in.");
    }

    #[test]
    fn test_duplicate_registration() {
        let failure = map_error(
            AuthOperation::SignUp,
            &api(422, None, "User already registered"),
        );
        assert_eq!(failure.code, AuthErrorCode::UserExists);
        assert_eq!(failure.message, "An account with that email already exists.");
    }

    #[test]
    fn test_error_code_used_when_message_is_reworded() {
        let failure = map_error(
            AuthOperation::SignUp,
            &api(422, Some("user_already_exists"), "A user with this email address has already been registered"),
        );
        assert_eq!(failure.code, AuthErrorCode::UserExists);
    }

    #[test]
    fn test_unmatched_message_passes_through() {
        let failure = map_error(
            AuthOperation::SignUp,
            &api(422, Some("weak_password"), "Password should be at least 6 characters"),
        );
        assert_eq!(failure.code, AuthErrorCode::AuthError);
        assert_eq!(failure.message, "Password should be at least 6 characters");
    }

    #[test]
    fn test_session_read_errors_are_session_errors() {
        let failure = map_error(AuthOperation::GetSession, &api(400, None, "Invalid Refresh Token"));
        assert_eq!(failure.code, AuthErrorCode::SessionError);
        assert_eq!(failure.message, "Invalid Refresh Token");
    }

    #[test]
    fn test_transport_failures_use_fallbacks() {
        let cases = [
            (AuthOperation::SignUp, "Sign up failed. Please try again."),
            (AuthOperation::SignIn, "Login failed. Please try again."),
            (AuthOperation::SignOut, "Logout failed. Please try again."),
            (AuthOperation::GetSession, "Could not get session."),
            (AuthOperation::GoogleSignIn, "Google sign-in failed. Please try again."),
        ];
        for (operation, expected) in cases {
            let failure = map_error(operation, &ProviderError::Timeout);
            assert_eq!(failure.code, AuthErrorCode::Unknown);
            assert_eq!(failure.message, expected);
        }
    }

    #[test]
    fn test_empty_provider_message_uses_fallback() {
        let failure = map_error(AuthOperation::SignIn, &api(500, None, ""));
        assert_eq!(failure.code, AuthErrorCode::AuthError);
        assert_eq!(failure.message, "Login failed. Please try again.");
    }

    #[test]
    fn test_oauth_errors_keep_their_text() {
        let failure = map_error(
            AuthOperation::GoogleSignIn,
            &ProviderError::OAuth("access_denied".to_string()),
        );
        assert_eq!(failure.code, AuthErrorCode::AuthError);
        assert_eq!(failure.message, "access_denied");
    }
}
