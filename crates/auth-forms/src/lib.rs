//! Headless form and view models for the portal.
//!
//! Forms validate locally and only call the auth context once every field
//! passes. A submission resolves to a [`FormOutcome`] the front end renders.

mod dashboard;
mod login;
mod outcome;
mod signup;
mod validation;
mod verify_email;

pub use dashboard::DashboardView;
pub use login::{start_google_sign_in, LoginForm};
pub use outcome::FormOutcome;
pub use signup::SignupForm;
pub use validation::{
    is_valid_email, Field, FieldErrors, CONFIRM_MISMATCH_MESSAGE, EMAIL_MESSAGE, MIN_PASSWORD_LEN,
    NAME_MESSAGE, PASSWORD_MESSAGE,
};
pub use verify_email::{ResendStatus, VerifyEmailView};

#[cfg(test)]
pub(crate) mod test_support {
    use auth_context::{AuthContext, MountOptions, SessionHandle};
    use auth_engine::testing::FakeProvider;
    use auth_engine::AuthService;
    use portal_storage::create_memory_vault;
    use std::sync::Arc;

    pub const EMAIL: &str = "user@example.com";
    pub const PASSWORD: &str = "correct-horse";

    pub async fn mounted(provider: FakeProvider) -> (Arc<FakeProvider>, AuthContext, SessionHandle) {
        let provider = Arc::new(provider);
        let service = Arc::new(AuthService::new(provider.clone(), create_memory_vault()));
        let context = AuthContext::mount(service, MountOptions::without_auto_refresh());
        let handle = context.handle();
        handle.wait_until_resolved().await;
        (provider, context, handle)
    }
}
