//! In-memory provider for tests.
//!
//! Behaves like the hosted service for the flows the portal uses, counts
//! every call per operation, and can be told to fail the next call of an
//! operation with a given error.

use crate::provider::{AuthProvider, AuthorizeRequest, SignUpRequest};
use crate::{code_challenge, ProviderError, ProviderResult, Session, SignUpResponse, User};
use async_trait::async_trait;
use parking_lot::{Mutex, MutexGuard};
use std::collections::{HashMap, VecDeque};
use url::Url;

/// Operation names accepted by [`FakeProvider::fail_next`] and [`FakeProvider::calls`].
pub mod ops {
    pub const SIGN_UP: &str = "sign_up";
    pub const SIGN_IN: &str = "sign_in";
    pub const SIGN_OUT: &str = "sign_out";
    pub const REFRESH: &str = "refresh_session";
    pub const GET_USER: &str = "get_user";
    pub const AUTHORIZE: &str = "authorize_url";
    pub const EXCHANGE: &str = "exchange_code";
    pub const RESEND: &str = "resend";
}

/// Shorthand for a provider error answer.
pub fn api_error(status: u16, code: Option<&str>, message: &str) -> ProviderError {
    ProviderError::Api {
        status,
        code: code.map(str::to_string),
        message: message.to_string(),
    }
}

struct Account {
    password: String,
    confirmed: bool,
    user: User,
}

struct FakeState {
    accounts: HashMap<String, Account>,
    access_tokens: HashMap<String, String>,
    refresh_tokens: HashMap<String, String>,
    oauth_codes: HashMap<String, String>,
    last_challenge: Option<String>,
    failures: HashMap<&'static str, VecDeque<ProviderError>>,
    calls: HashMap<&'static str, usize>,
    resent_to: Vec<String>,
    last_email_redirect: Option<String>,
    token_counter: u64,
    session_ttl_secs: i64,
    auto_confirm: bool,
}

impl FakeState {
    fn create_account(&mut self, email: &str, password: &str, name: Option<&str>, confirmed: bool) -> User {
        let mut extra = serde_json::Map::new();
        if let Some(name) = name {
            extra.insert("user_metadata".to_string(), serde_json::json!({ "name": name }));
        }
        let user = User {
            id: format!("user-{}", self.accounts.len() + 1),
            email: Some(email.to_string()),
            extra,
        };
        self.accounts.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                confirmed,
                user: user.clone(),
            },
        );
        user
    }

    fn issue_session(&mut self, email: &str) -> ProviderResult<Session> {
        let user = self
            .accounts
            .get(email)
            .map(|account| account.user.clone())
            .ok_or_else(|| api_error(404, Some("user_not_found"), "User not found"))?;

        self.token_counter += 1;
        let access_token = format!("access-{}", self.token_counter);
        let refresh_token = format!("refresh-{}", self.token_counter);
        self.access_tokens
            .insert(access_token.clone(), email.to_string());
        self.refresh_tokens
            .insert(refresh_token.clone(), email.to_string());

        Ok(Session {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            expires_in: self.session_ttl_secs,
            expires_at: Some(chrono::Utc::now().timestamp() + self.session_ttl_secs),
            user,
            extra: serde_json::Map::new(),
        })
    }
}

/// In-memory stand-in for the hosted identity provider.
pub struct FakeProvider {
    state: Mutex<FakeState>,
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeProvider {
    /// Empty provider; signups wait for email confirmation.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                accounts: HashMap::new(),
                access_tokens: HashMap::new(),
                refresh_tokens: HashMap::new(),
                oauth_codes: HashMap::new(),
                last_challenge: None,
                failures: HashMap::new(),
                calls: HashMap::new(),
                resent_to: Vec::new(),
                last_email_redirect: None,
                token_counter: 0,
                session_ttl_secs: 3600,
                auto_confirm: false,
            }),
        }
    }

    /// Add a confirmed account.
    pub fn with_account(self, email: &str, password: &str) -> Self {
        self.state.lock().create_account(email, password, None, true);
        self
    }

    /// Add an account whose email is not confirmed yet.
    pub fn with_unconfirmed_account(self, email: &str, password: &str) -> Self {
        self.state.lock().create_account(email, password, None, false);
        self
    }

    /// Issue sessions directly on signup.
    pub fn set_auto_confirm(&self, auto_confirm: bool) {
        self.state.lock().auto_confirm = auto_confirm;
    }

    /// Lifetime of sessions issued from now on.
    pub fn set_session_ttl(&self, secs: i64) {
        self.state.lock().session_ttl_secs = secs;
    }

    /// Fail the next call of `op` with `error`. Queued errors are used in order.
    pub fn fail_next(&self, op: &'static str, error: ProviderError) {
        self.state
            .lock()
            .failures
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// Forget every refresh token, as if they were all revoked.
    pub fn revoke_refresh_tokens(&self) {
        self.state.lock().refresh_tokens.clear();
    }

    /// Change a user's metadata on the provider side.
    pub fn update_user_metadata(&self, email: &str, key: &str, value: &str) {
        let mut state = self.state.lock();
        if let Some(account) = state.accounts.get_mut(email) {
            let metadata = account
                .user
                .extra
                .entry("user_metadata".to_string())
                .or_insert_with(|| serde_json::json!({}));
            if let Some(map) = metadata.as_object_mut() {
                map.insert(key.to_string(), serde_json::json!(value));
            }
        }
    }

    /// Simulate the consent screen: return the code the redirect would carry.
    pub fn issue_oauth_code(&self, email: &str) -> String {
        let mut state = self.state.lock();
        if !state.accounts.contains_key(email) {
            state.create_account(email, "", Some("Google User"), true);
        }
        let code = format!("code-{}", state.oauth_codes.len() + 1);
        state.oauth_codes.insert(code.clone(), email.to_string());
        code
    }

    /// Number of calls made to `op`.
    pub fn calls(&self, op: &str) -> usize {
        self.state.lock().calls.get(op).copied().unwrap_or(0)
    }

    /// Number of calls made to any operation.
    pub fn total_calls(&self) -> usize {
        self.state.lock().calls.values().sum()
    }

    /// Addresses a confirmation email was resent to.
    pub fn resent_to(&self) -> Vec<String> {
        self.state.lock().resent_to.clone()
    }

    /// `redirect_to` carried by the most recent signup.
    pub fn last_email_redirect(&self) -> Option<String> {
        self.state.lock().last_email_redirect.clone()
    }

    fn record(&self, op: &'static str) -> ProviderResult<MutexGuard<'_, FakeState>> {
        let mut state = self.state.lock();
        *state.calls.entry(op).or_default() += 1;
        if let Some(error) = state.failures.get_mut(op).and_then(VecDeque::pop_front) {
            return Err(error);
        }
        Ok(state)
    }
}

#[async_trait]
impl AuthProvider for FakeProvider {
    async fn sign_up(&self, request: &SignUpRequest) -> ProviderResult<SignUpResponse> {
        let mut state = self.record(ops::SIGN_UP)?;
        state.last_email_redirect = request.email_redirect_to.clone();
        if state.accounts.contains_key(&request.email) {
            return Err(api_error(
                422,
                Some("user_already_exists"),
                "User already registered",
            ));
        }

        let confirmed = state.auto_confirm;
        let user = state.create_account(
            &request.email,
            &request.password,
            request.display_name.as_deref(),
            confirmed,
        );
        if confirmed {
            Ok(SignUpResponse::Session(state.issue_session(&request.email)?))
        } else {
            Ok(SignUpResponse::User(user))
        }
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> ProviderResult<Session> {
        let mut state = self.record(ops::SIGN_IN)?;
        let (matches, confirmed) = match state.accounts.get(email) {
            Some(account) => (account.password == password, account.confirmed),
            None => (false, false),
        };
        if !matches {
            return Err(api_error(
                400,
                Some("invalid_credentials"),
                "Invalid login credentials",
            ));
        }
        if !confirmed {
            return Err(api_error(
                400,
                Some("email_not_confirmed"),
                "Email not confirmed",
            ));
        }
        state.issue_session(email)
    }

    async fn sign_out(&self, access_token: &str) -> ProviderResult<()> {
        let mut state = self.record(ops::SIGN_OUT)?;
        match state.access_tokens.remove(access_token) {
            Some(_) => Ok(()),
            None => Err(api_error(401, Some("bad_jwt"), "invalid JWT")),
        }
    }

    async fn refresh_session(&self, refresh_token: &str) -> ProviderResult<Session> {
        let mut state = self.record(ops::REFRESH)?;
        let email = state.refresh_tokens.remove(refresh_token).ok_or_else(|| {
            api_error(
                400,
                Some("refresh_token_not_found"),
                "Invalid Refresh Token: Refresh Token Not Found",
            )
        })?;
        state.issue_session(&email)
    }

    async fn get_user(&self, access_token: &str) -> ProviderResult<User> {
        let state = self.record(ops::GET_USER)?;
        state
            .access_tokens
            .get(access_token)
            .and_then(|email| state.accounts.get(email))
            .map(|account| account.user.clone())
            .ok_or_else(|| api_error(401, Some("bad_jwt"), "invalid JWT"))
    }

    fn authorize_url(&self, request: &AuthorizeRequest) -> ProviderResult<Url> {
        let mut state = self.record(ops::AUTHORIZE)?;
        state.last_challenge = Some(request.code_challenge.clone());

        let mut url = Url::parse("https://fake.provider.test/auth/v1/authorize")?;
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
        let mut state = self.record(ops::EXCHANGE)?;
        if state.last_challenge.as_deref() != Some(code_challenge(code_verifier).as_str()) {
            return Err(api_error(
                400,
                Some("bad_code_verifier"),
                "code challenge does not match previously saved code verifier",
            ));
        }
        let email = state.oauth_codes.remove(auth_code).ok_or_else(|| {
            api_error(
                404,
                Some("flow_state_not_found"),
                "invalid flow state, no valid flow state found",
            )
        })?;
        state.last_challenge = None;
        state.issue_session(&email)
    }

    async fn resend_signup_confirmation(&self, email: &str) -> ProviderResult<()> {
        let mut state = self.record(ops::RESEND)?;
        state.resent_to.push(email.to_string());
        Ok(())
    }
}
