//! Login form.

use crate::validation::{check_email, check_password};
use crate::{FieldErrors, FormOutcome};
use auth_context::{SessionHandle, DASHBOARD_PATH};
use tracing::debug;

/// Email/password login.
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        check_email(&mut errors, &self.email);
        check_password(&mut errors, &self.password);
        errors
    }

    /// Validate, then sign in. Success navigates to the dashboard.
    pub async fn submit(&self, handle: &SessionHandle) -> FormOutcome {
        let errors = self.validate();
        if !errors.is_empty() {
            debug!(fields = errors.len(), "Login form invalid");
            return FormOutcome::Invalid(errors);
        }

        match handle.sign_in(&self.email, &self.password).await {
            Ok(_) => FormOutcome::Navigate { to: DASHBOARD_PATH },
            Err(failure) => failure.into(),
        }
    }
}

/// The "Login with Google" button.
pub fn start_google_sign_in(handle: &SessionHandle, redirect_to: &str) -> FormOutcome {
    match handle.sign_in_with_google(redirect_to) {
        Ok(url) => FormOutcome::OpenBrowser { url },
        Err(failure) => failure.into(),
    }
}
