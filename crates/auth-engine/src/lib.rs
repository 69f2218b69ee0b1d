//! Provider access for the auth portal.
//!
//! This crate provides:
//! - A GoTrue-compatible HTTP client behind the [`AuthProvider`] seam
//! - The [`AuthService`], which normalizes every outcome into an [`AuthResult`]
//!   and publishes typed session-change events
//! - PKCE helpers and a local callback server for the Google OAuth redirect
//! - Token refresh with exponential backoff

mod error;
mod error_map;
mod oauth;
mod pkce;
mod provider;
mod refresh;
mod result;
mod service;
mod supabase_client;
mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use error::{ProviderError, ProviderResult};
pub use error_map::{map_error, map_provider_message, AuthOperation};
pub use oauth::{CallbackListener, OAuthCallback, OAuthCallbackServer};
pub use pkce::{code_challenge, generate_code_verifier};
pub use provider::{AuthProvider, AuthorizeRequest, SignUpRequest};
pub use refresh::{RefreshConfig, REFRESH_MARGIN};
pub use result::{AuthErrorCode, AuthFailure, AuthResult, ProviderErrorDetail};
pub use service::{AuthService, AuthSubscription, SignUpOutcome, GOOGLE_PROVIDER};
pub use supabase_client::SupabaseAuthClient;
pub use types::{AuthChangeEvent, AuthStateChange, Session, SignUpResponse, User};
