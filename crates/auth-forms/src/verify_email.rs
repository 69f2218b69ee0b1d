//! "Check your inbox" view shown after a signup that needs confirmation.

use auth_context::SessionHandle;

/// Result of the last resend attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResendStatus {
    Sent,
    Failed,
}

impl ResendStatus {
    pub fn message(&self) -> &'static str {
        match self {
            ResendStatus::Sent => "Verification email sent! Check your inbox.",
            ResendStatus::Failed => "Failed to resend. Please try again.",
        }
    }
}

/// State of the verify-email view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyEmailView {
    pub email: String,
    pub last_resend: Option<ResendStatus>,
}

impl VerifyEmailView {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            last_resend: None,
        }
    }

    /// Ask for another confirmation email.
    pub async fn resend(&mut self, handle: &SessionHandle) -> ResendStatus {
        let status = match handle.resend_verification(&self.email).await {
            Ok(()) => ResendStatus::Sent,
            Err(_) => ResendStatus::Failed,
        };
        self.last_resend = Some(status);
        status
    }
}
