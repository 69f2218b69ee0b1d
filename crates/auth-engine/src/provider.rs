//! The seam between the auth service and the hosted identity provider.

use crate::{ProviderResult, Session, SignUpResponse, User};
use async_trait::async_trait;
use url::Url;

/// Registration payload.
#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    /// Stored in the provider's user metadata as `name`.
    pub display_name: Option<String>,
    /// Where the confirmation link should land.
    pub email_redirect_to: Option<String>,
}

/// Parameters of the browser consent URL.
#[derive(Debug, Clone)]
pub struct AuthorizeRequest {
    /// Provider name understood by the identity service, e.g. `google`.
    pub provider: String,
    pub redirect_to: String,
    pub code_challenge: String,
    /// Passed through to the upstream OAuth provider.
    pub query_params: Vec<(String, String)>,
}

/// Operations the portal needs from the identity provider.
///
/// Implemented over HTTP by [`crate::SupabaseAuthClient`]; tests substitute
/// an in-memory provider.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Register a new account.
    async fn sign_up(&self, request: &SignUpRequest) -> ProviderResult<SignUpResponse>;

    /// Exchange email and password for a session.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> ProviderResult<Session>;

    /// Revoke the session owning `access_token`.
    async fn sign_out(&self, access_token: &str) -> ProviderResult<()>;

    /// Trade a refresh token for a new session.
    async fn refresh_session(&self, refresh_token: &str) -> ProviderResult<Session>;

    /// Fetch the user owning `access_token`.
    async fn get_user(&self, access_token: &str) -> ProviderResult<User>;

    /// Build the URL the browser is sent to for OAuth consent.
    fn authorize_url(&self, request: &AuthorizeRequest) -> ProviderResult<Url>;

    /// Complete a PKCE redirect flow.
    async fn exchange_code_for_session(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> ProviderResult<Session>;

    /// Send the signup confirmation email again.
    async fn resend_signup_confirmation(&self, email: &str) -> ProviderResult<()>;
}
