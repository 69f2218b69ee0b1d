//! GoTrue REST client for the provider's auth API.
//!
//! All requests go under `<project url>/auth/v1` and carry the public
//! `apikey` header; calls made on behalf of a signed-in user add the
//! session's bearer token. Response bodies are never logged verbatim.

use crate::provider::{AuthProvider, AuthorizeRequest, SignUpRequest};
use crate::{ProviderError, ProviderResult, Session, SignUpResponse, User};
use async_trait::async_trait;
use portal_config_and_utils::Config;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;
use url::Url;

fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

/// Error body shapes GoTrue has used across versions.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

fn parse_error_body(status: StatusCode, body: &str) -> ProviderError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();

    let message = [
        parsed.msg,
        parsed.message,
        parsed.error_description,
        parsed.error,
    ]
    .into_iter()
    .flatten()
    .find(|m| !m.trim().is_empty())
    .unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    });

    let code = parsed.error_code.or_else(|| {
        parsed
            .code
            .as_ref()
            .and_then(|c| c.as_str())
            .map(str::to_string)
    });

    ProviderError::Api {
        status: status.as_u16(),
        code,
        message,
    }
}

/// Client for the provider's auth endpoints.
#[derive(Clone)]
pub struct SupabaseAuthClient {
    http_client: reqwest::Client,
    api_url: String,
    anon_key: String,
}

impl SupabaseAuthClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `api_url` - The project URL (e.g., `https://xyz.supabase.co`)
    /// * `anon_key` - The public API key
    /// * `request_timeout` - Applied to every request
    pub fn new(
        api_url: impl Into<String>,
        anon_key: impl Into<String>,
        request_timeout: Duration,
    ) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(ProviderError::Http)?;

        let api_url: String = api_url.into();
        Ok(Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
        })
    }

    /// Create a client from validated portal configuration.
    pub fn from_config(config: &Config) -> ProviderResult<Self> {
        Self::new(
            config.api_base(),
            config.supabase_anon_key.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Project URL this client talks to.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Build the auth API URL for an endpoint.
    fn auth_url(&self, endpoint: &str) -> String {
        format!("{}/auth/v1/{}", self.api_url, endpoint)
    }

    async fn send(
        &self,
        request: RequestBuilder,
        operation: &'static str,
    ) -> ProviderResult<Response> {
        let response = request
            .header("apikey", &self.anon_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(status = %status, operation, "Provider request succeeded");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let body_summary = summarize_response_body(&body);
        tracing::warn!(
            status = %status,
            body_summary = %body_summary,
            operation,
            "Provider request failed"
        );
        Err(parse_error_body(status, &body))
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> ProviderResult<T> {
        let body = response
            .text()
            .await
            .map_err(ProviderError::from_transport)?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn token_grant(
        &self,
        grant_type: &str,
        body: serde_json::Value,
        operation: &'static str,
    ) -> ProviderResult<Session> {
        let url = format!("{}?grant_type={}", self.auth_url("token"), grant_type);
        let response = self
            .send(self.http_client.post(&url).json(&body), operation)
            .await?;
        let session: Session = Self::read_json(response).await?;
        Ok(session.with_computed_expiry())
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuthClient {
    async fn sign_up(&self, request: &SignUpRequest) -> ProviderResult<SignUpResponse> {
        let mut url = Url::parse(&self.auth_url("signup"))?;
        if let Some(redirect_to) = &request.email_redirect_to {
            url.query_pairs_mut().append_pair("redirect_to", redirect_to);
        }

        let mut body = serde_json::json!({
            "email": request.email,
            "password": request.password,
        });
        if let Some(name) = &request.display_name {
            body["data"] = serde_json::json!({ "name": name });
        }

        tracing::debug!("Registering new account");

        let response = self
            .send(self.http_client.post(url).json(&body), "sign_up")
            .await?;
        Self::read_json(response).await
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> ProviderResult<Session> {
        tracing::debug!("Attempting email/password login");
        self.token_grant(
            "password",
            serde_json::json!({ "email": email, "password": password }),
            "sign_in",
        )
        .await
    }

    async fn sign_out(&self, access_token: &str) -> ProviderResult<()> {
        let url = format!("{}?scope=global", self.auth_url("logout"));
        self.send(
            self.http_client
                .post(&url)
                .header("Authorization", format!("Bearer {}", access_token)),
            "sign_out",
        )
        .await?;
        Ok(())
    }

    async fn refresh_session(&self, refresh_token: &str) -> ProviderResult<Session> {
        tracing::debug!("Refreshing token");
        self.token_grant(
            "refresh_token",
            serde_json::json!({ "refresh_token": refresh_token }),
            "refresh_session",
        )
        .await
    }

    async fn get_user(&self, access_token: &str) -> ProviderResult<User> {
        let response = self
            .send(
                self.http_client
                    .get(self.auth_url("user"))
                    .header("Authorization", format!("Bearer {}", access_token)),
                "get_user",
            )
            .await?;
        Self::read_json(response).await
    }

    fn authorize_url(&self, request: &AuthorizeRequest) -> ProviderResult<Url> {
        let mut url = Url::parse(&self.auth_url("authorize"))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("provider", &request.provider)
                .append_pair("redirect_to", &request.redirect_to)
                .append_pair("code_challenge", &request.code_challenge)
                .append_pair("code_challenge_method", "s256");
            for (key, value) in &request.query_params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn exchange_code_for_session(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> ProviderResult<Session> {
        self.token_grant(
            "pkce",
            serde_json::json!({ "auth_code": auth_code, "code_verifier": code_verifier }),
            "exchange_code",
        )
        .await
    }

    async fn resend_signup_confirmation(&self, email: &str) -> ProviderResult<()> {
        self.send(
            self.http_client
                .post(self.auth_url("resend"))
                .json(&serde_json::json!({ "type": "signup", "email": email })),
            "resend",
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SupabaseAuthClient {
        SupabaseAuthClient::new(
            "https://abc.supabase.co/",
            "anon-key",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        assert_eq!(client().api_url(), "https://abc.supabase.co");
        assert_eq!(
            client().auth_url("signup"),
            "https://abc.supabase.co/auth/v1/signup"
        );
    }

    #[test]
    fn test_summarize_hides_body() {
        let summary = summarize_response_body("{\"access_token\":\"secret\"}");
        assert!(summary.starts_with("len=25,digest="));
        assert!(!summary.contains("secret"));
    }

    #[test]
    fn test_parse_error_body_prefers_msg() {
        let error = parse_error_body(
            StatusCode::BAD_REQUEST,
            r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#,
        );
        match error {
            ProviderError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 400);
                assert_eq!(code.as_deref(), Some("invalid_credentials"));
                assert_eq!(message, "Invalid login credentials");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_error_body_oauth_shape() {
        let error = parse_error_body(
            StatusCode::BAD_REQUEST,
            r#"{"error":"invalid_grant","error_description":"Invalid Refresh Token: Refresh Token Not Found"}"#,
        );
        assert_eq!(
            error.to_string(),
            "Invalid Refresh Token: Refresh Token Not Found"
        );
    }

    #[test]
    fn test_parse_error_body_non_json() {
        let error = parse_error_body(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert_eq!(error.to_string(), "Bad Gateway");
        assert!(error.is_transient());
    }

    #[test]
    fn test_authorize_url_carries_pkce_and_query_params() {
        let url = client()
            .authorize_url(&AuthorizeRequest {
                provider: "google".to_string(),
                redirect_to: "http://localhost:9876/callback".to_string(),
                code_challenge: "challenge".to_string(),
                query_params: vec![
                    ("access_type".to_string(), "offline".to_string()),
                    ("prompt".to_string(), "consent".to_string()),
                ],
            })
            .unwrap();

        assert_eq!(url.path(), "/auth/v1/authorize");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("provider".into(), "google".into())));
        assert!(pairs.contains(&(
            "redirect_to".into(),
            "http://localhost:9876/callback".into()
        )));
        assert!(pairs.contains(&("code_challenge_method".into(), "s256".into())));
        assert!(pairs.contains(&("access_type".into(), "offline".into())));
        assert!(pairs.contains(&("prompt".into(), "consent".into())));
    }
}
