//! Storage key constants.

/// Storage keys used by the portal
pub struct StorageKeys;

impl StorageKeys {
    /// Current provider session (JSON)
    pub const AUTH_SESSION: &'static str = "auth_session";

    /// PKCE code verifier for an OAuth redirect in flight
    pub const PKCE_CODE_VERIFIER: &'static str = "pkce_code_verifier";
}
