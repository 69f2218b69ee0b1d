//! Signup form.

use crate::validation::{check_email, check_password};
use crate::{Field, FieldErrors, FormOutcome, CONFIRM_MISMATCH_MESSAGE, NAME_MESSAGE};
use auth_context::{SessionHandle, DASHBOARD_PATH};
use tracing::debug;

/// Account registration.
#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignupForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if self.name.trim().is_empty() {
            errors.insert(Field::Name, NAME_MESSAGE);
        }
        check_email(&mut errors, &self.email);
        check_password(&mut errors, &self.password);
        if self.password != self.confirm_password {
            errors.insert(Field::ConfirmPassword, CONFIRM_MISMATCH_MESSAGE);
        }
        errors
    }

    /// Validate, then register.
    ///
    /// With a session the user lands on the dashboard; without one the
    /// verify-email view is shown and the user stays signed out.
    pub async fn submit(&self, handle: &SessionHandle) -> FormOutcome {
        let errors = self.validate();
        if !errors.is_empty() {
            debug!(fields = errors.len(), "Signup form invalid");
            return FormOutcome::Invalid(errors);
        }

        match handle
            .sign_up(&self.email, &self.password, Some(self.name.trim()))
            .await
        {
            Ok(outcome) if outcome.needs_confirmation() => FormOutcome::ConfirmEmail {
                email: self.email.clone(),
            },
            Ok(_) => FormOutcome::Navigate { to: DASHBOARD_PATH },
            Err(failure) => failure.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{mounted, EMAIL, PASSWORD};
    use auth_engine::testing::FakeProvider;
    use auth_engine::AuthErrorCode;

    fn form(name: &str, email: &str, password: &str, confirm: &str) -> SignupForm {
        SignupForm {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    #[test]
    fn test_every_field_is_checked() {
        let errors = form("  ", "nope", "short", "different").validate();
        assert_eq!(errors.get(Field::Name), Some(NAME_MESSAGE));
        assert_eq!(errors.get(Field::Email), Some("Enter a valid email"));
        assert_eq!(
            errors.get(Field::Password),
            Some("Password must be at least 8 characters")
        );
        assert_eq!(errors.get(Field::ConfirmPassword), Some(CONFIRM_MISMATCH_MESSAGE));
    }

    #[tokio::test]
    async fn test_pending_confirmation_shows_verify_email() {
        let (provider, _context, handle) = mounted(FakeProvider::new()).await;

        let outcome = form("Ada", EMAIL, PASSWORD, PASSWORD).submit(&handle).await;

        assert_eq!(
            outcome,
            FormOutcome::ConfirmEmail {
                email: EMAIL.to_string()
            }
        );
        assert!(!handle.snapshot().is_authenticated());
        assert_eq!(provider.total_calls(), 1);
    }

    #[tokio::test]
    async fn test_auto_confirmed_signup_goes_to_dashboard() {
        let provider = FakeProvider::new();
        provider.set_auto_confirm(true);
        let (_provider, _context, handle) = mounted(provider).await;

        let outcome = form("Ada", EMAIL, PASSWORD, PASSWORD).submit(&handle).await;

        assert_eq!(outcome, FormOutcome::Navigate { to: DASHBOARD_PATH });
        let user = handle.snapshot().user.unwrap();
        assert_eq!(user.display_name(), Some("Ada"));
    }

    #[tokio::test]
    async fn test_existing_account_is_rejected() {
        let (_provider, _context, handle) =
            mounted(FakeProvider::new().with_account(EMAIL, PASSWORD)).await;

        let outcome = form("Ada", EMAIL, PASSWORD, PASSWORD).submit(&handle).await;

        assert_eq!(
            outcome,
            FormOutcome::Rejected {
                code: AuthErrorCode::UserExists,
                message: "An account with that email already exists.".to_string(),
            }
        );
    }
}
