use auth_engine::{AuthErrorCode, AuthFailure};
use url::Url;

/// What the front end should do after a submission.
#[derive(Debug, Clone, PartialEq)]
pub enum FormOutcome {
    /// Local validation failed; nothing was sent.
    Invalid(crate::FieldErrors),
    /// The provider refused; show `message` inline.
    Rejected {
        code: AuthErrorCode,
        message: String,
    },
    /// Go to another route.
    Navigate { to: &'static str },
    /// Signup needs email confirmation; show the verify-email view.
    ConfirmEmail { email: String },
    /// Open the provider's consent screen.
    OpenBrowser { url: Url },
}

impl From<AuthFailure> for FormOutcome {
    fn from(failure: AuthFailure) -> Self {
        FormOutcome::Rejected {
            code: failure.code,
            message: failure.message,
        }
    }
}
