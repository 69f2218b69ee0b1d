//! The auth service: every provider operation, normalized.
//!
//! Each operation returns an [`AuthResult`]. Operations that change the
//! session persist it through the [`SessionVault`] and publish exactly one
//! [`AuthStateChange`] on the broadcast channel handed out by
//! [`AuthService::subscribe`].

use crate::error_map::{map_error, AuthOperation};
use crate::provider::{AuthProvider, AuthorizeRequest, SignUpRequest};
use crate::refresh::{RefreshConfig, REFRESH_MARGIN};
use crate::{
    code_challenge, generate_code_verifier, AuthChangeEvent, AuthFailure, AuthResult,
    AuthStateChange, ProviderError, ProviderResult, Session, User,
};
use parking_lot::Mutex;
use portal_storage::{SessionVault, StorageResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

/// Provider name for Google sign-in.
pub const GOOGLE_PROVIDER: &str = "google";

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Result of a registration.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpOutcome {
    pub user: User,
    /// Absent while the email address awaits confirmation.
    pub session: Option<Session>,
}

impl SignUpOutcome {
    pub fn needs_confirmation(&self) -> bool {
        self.session.is_none()
    }
}

/// A registered listener for session changes. Dropping it deregisters.
pub struct AuthSubscription {
    receiver: broadcast::Receiver<AuthStateChange>,
}

impl AuthSubscription {
    /// Wait for the next change. Returns `None` once the service is gone.
    ///
    /// A listener that falls behind skips to the oldest change still
    /// buffered; changes carry full sessions so nothing is lost by skipping.
    pub async fn recv(&mut self) -> Option<AuthStateChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) => return Some(change),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Auth listener lagged, skipping stale changes");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take a change if one is already queued.
    pub fn try_recv(&mut self) -> Option<AuthStateChange> {
        loop {
            match self.receiver.try_recv() {
                Ok(change) => return Some(change),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Stop listening.
    pub fn unsubscribe(self) {}
}

fn fail(operation: AuthOperation, error: ProviderError) -> AuthFailure {
    let failure = map_error(operation, &error);
    warn!(
        operation = ?operation,
        code = %failure.code,
        error = %error,
        "Auth operation failed"
    );
    failure
}

/// Wraps the provider and owns the persisted session.
pub struct AuthService {
    provider: Arc<dyn AuthProvider>,
    vault: SessionVault,
    events: broadcast::Sender<AuthStateChange>,
    seq: AtomicU64,
    /// Memory copy of the vault's session; `None` means read the vault.
    current: Mutex<Option<Session>>,
    refresh_lock: tokio::sync::Mutex<()>,
    refresh_config: RefreshConfig,
    email_redirect_to: Option<String>,
}

impl AuthService {
    /// Create a new auth service.
    pub fn new(provider: Arc<dyn AuthProvider>, vault: SessionVault) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            provider,
            vault,
            events,
            seq: AtomicU64::new(0),
            current: Mutex::new(None),
            refresh_lock: tokio::sync::Mutex::new(()),
            refresh_config: RefreshConfig::default(),
            email_redirect_to: None,
        }
    }

    /// Use a custom refresh retry configuration.
    pub fn with_refresh_config(mut self, refresh_config: RefreshConfig) -> Self {
        self.refresh_config = refresh_config;
        self
    }

    /// Where signup confirmation links should land.
    pub fn with_email_redirect(mut self, url: impl Into<String>) -> Self {
        self.email_redirect_to = Some(url.into());
        self
    }

    // ==========================================
    // Change events
    // ==========================================

    /// Register a listener for session changes.
    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription {
            receiver: self.events.subscribe(),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Sequence number of the last published change (0 before any).
    pub fn last_seq(&self) -> u64 {
        self.seq.load(Ordering::SeqCst)
    }

    fn publish(&self, event: AuthChangeEvent, session: Option<Session>) -> u64 {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(seq, event = ?event, "Publishing auth state change");
        if self
            .events
            .send(AuthStateChange {
                seq,
                event,
                session,
            })
            .is_err()
        {
            debug!(seq, "No auth listeners registered");
        }
        seq
    }

    // ==========================================
    // Session cache
    // ==========================================

    fn cached_session(&self) -> StorageResult<Option<Session>> {
        let mut current = self.current.lock();
        if let Some(session) = current.as_ref() {
            return Ok(Some(session.clone()));
        }
        let stored: Option<Session> = self.vault.load_session()?;
        *current = stored.clone();
        Ok(stored)
    }

    fn set_session(&self, session: &Session) {
        *self.current.lock() = Some(session.clone());
        if let Err(e) = self.vault.store_session(session) {
            warn!(error = %e, "Failed to persist session, keeping it in memory only");
        }
    }

    fn clear_session(&self) {
        *self.current.lock() = None;
        if let Err(e) = self.vault.clear_session() {
            warn!(error = %e, "Failed to remove persisted session");
        }
    }

    // ==========================================
    // Operations
    // ==========================================

    /// Register a new account.
    ///
    /// When the deployment confirms emails, no session is returned and no
    /// change is published; the user signs in after confirming.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> AuthResult<SignUpOutcome> {
        let request = SignUpRequest {
            email: email.to_string(),
            password: password.to_string(),
            display_name: display_name.map(str::to_string),
            email_redirect_to: self.email_redirect_to.clone(),
        };

        let response = self
            .provider
            .sign_up(&request)
            .await
            .map_err(|e| fail(AuthOperation::SignUp, e))?;

        let (user, session) = response.into_parts();
        match &session {
            Some(session) => {
                self.set_session(session);
                self.publish(AuthChangeEvent::SignedIn, Some(session.clone()));
                info!(user_id = %user.id, "Signup complete, signed in");
            }
            None => info!(user_id = %user.id, "Signup complete, awaiting email confirmation"),
        }

        Ok(SignUpOutcome { user, session })
    }

    /// Sign in with email and password.
    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<Session> {
        let session = self
            .provider
            .sign_in_with_password(email, password)
            .await
            .map_err(|e| fail(AuthOperation::SignIn, e))?;

        self.set_session(&session);
        self.publish(AuthChangeEvent::SignedIn, Some(session.clone()));
        info!(user_id = %session.user.id, "Login successful");

        Ok(session)
    }

    /// Revoke the provider session and forget the local one.
    ///
    /// A provider answer saying the session is already gone counts as success.
    pub async fn sign_out(&self) -> AuthResult<()> {
        let session = self.cached_session().unwrap_or_else(|e| {
            warn!(error = %e, "Stored session unreadable, signing out locally");
            None
        });

        if let Some(session) = session {
            if let Err(e) = self.provider.sign_out(&session.access_token).await {
                if e.is_session_gone() {
                    debug!(status = ?e.status(), "Session already gone on the provider");
                } else {
                    return Err(fail(AuthOperation::SignOut, e));
                }
            }
        }

        self.clear_session();
        self.publish(AuthChangeEvent::SignedOut, None);
        info!("Logged out");
        Ok(())
    }

    /// Current session, refreshed first when it is about to expire.
    pub async fn get_session(&self) -> AuthResult<Option<Session>> {
        let session = self
            .cached_session()
            .map_err(|e| fail(AuthOperation::GetSession, e.into()))?;

        match session {
            Some(session) if session.expires_within(REFRESH_MARGIN) => self.refresh_current().await,
            other => Ok(other),
        }
    }

    async fn refresh_current(&self) -> AuthResult<Option<Session>> {
        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while this one waited.
        let session = match self
            .cached_session()
            .map_err(|e| fail(AuthOperation::GetSession, e.into()))?
        {
            Some(session) if session.expires_within(REFRESH_MARGIN) => session,
            other => return Ok(other),
        };

        info!("Token near expiry, attempting refresh");

        match self.refresh_with_backoff(&session.refresh_token).await {
            Ok(refreshed) => {
                self.set_session(&refreshed);
                self.publish(AuthChangeEvent::TokenRefreshed, Some(refreshed.clone()));
                info!(user_id = %refreshed.user.id, "Token refreshed successfully");
                Ok(Some(refreshed))
            }
            Err(e) if e.is_transient() || matches!(e, ProviderError::RefreshExhausted(_)) => {
                // Keep the session; the next call tries again.
                Err(fail(AuthOperation::GetSession, e))
            }
            Err(e) => {
                self.clear_session();
                self.publish(AuthChangeEvent::SignedOut, None);
                Err(fail(AuthOperation::GetSession, e))
            }
        }
    }

    /// Refresh the session with exponential backoff retry.
    async fn refresh_with_backoff(&self, refresh_token: &str) -> ProviderResult<Session> {
        let mut last_error = None;

        for attempt in 0..self.refresh_config.max_retries {
            match self.provider.refresh_session(refresh_token).await {
                Ok(session) => return Ok(session),
                Err(e) if e.is_transient() => {
                    last_error = Some(e);

                    if attempt + 1 < self.refresh_config.max_retries {
                        let delay = self.refresh_config.delay_for_attempt(attempt);
                        debug!(
                            attempt = attempt + 1,
                            max_retries = self.refresh_config.max_retries,
                            delay_ms = delay.as_millis() as u64,
                            "Refresh failed with transient error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => {
                    warn!("Refresh failed with non-transient error: {}", e);
                    return Err(e);
                }
            }
        }

        warn!(
            "Refresh failed after {} attempts",
            self.refresh_config.max_retries
        );
        Err(last_error.unwrap_or(ProviderError::RefreshExhausted(
            self.refresh_config.max_retries,
        )))
    }

    /// Verify the session's user with the provider.
    ///
    /// If the provider's copy differs from the cached one, the session is
    /// updated and `USER_UPDATED` is published.
    pub async fn get_user(&self) -> AuthResult<Option<User>> {
        let Some(mut session) = self.get_session().await? else {
            return Ok(None);
        };

        let user = self
            .provider
            .get_user(&session.access_token)
            .await
            .map_err(|e| fail(AuthOperation::GetUser, e))?;

        if user != session.user {
            session.user = user.clone();
            self.set_session(&session);
            self.publish(AuthChangeEvent::UserUpdated, Some(session));
            info!(user_id = %user.id, "User profile updated");
        }

        Ok(Some(user))
    }

    /// Start Google sign-in: returns the consent URL to open in the browser.
    ///
    /// The session itself arrives later through the change subscription,
    /// once [`AuthService::exchange_code_for_session`] completes the flow.
    pub fn sign_in_with_google(&self, redirect_to: &str) -> AuthResult<Url> {
        let verifier = generate_code_verifier();
        self.vault
            .store_code_verifier(&verifier)
            .map_err(|e| fail(AuthOperation::GoogleSignIn, e.into()))?;

        let request = AuthorizeRequest {
            provider: GOOGLE_PROVIDER.to_string(),
            redirect_to: redirect_to.to_string(),
            code_challenge: code_challenge(&verifier),
            query_params: vec![
                ("access_type".to_string(), "offline".to_string()),
                ("prompt".to_string(), "consent".to_string()),
            ],
        };

        let url = self
            .provider
            .authorize_url(&request)
            .map_err(|e| fail(AuthOperation::GoogleSignIn, e))?;
        info!(provider = GOOGLE_PROVIDER, "OAuth sign-in started");
        Ok(url)
    }

    /// Complete the redirect flow with the code the provider sent back.
    pub async fn exchange_code_for_session(&self, auth_code: &str) -> AuthResult<Session> {
        let verifier = self
            .vault
            .take_code_verifier()
            .map_err(|e| fail(AuthOperation::GoogleSignIn, e.into()))?
            .ok_or_else(|| {
                fail(
                    AuthOperation::GoogleSignIn,
                    ProviderError::OAuth(
                        "No sign-in in progress. Start Google sign-in again.".to_string(),
                    ),
                )
            })?;

        let session = self
            .provider
            .exchange_code_for_session(auth_code, &verifier)
            .await
            .map_err(|e| fail(AuthOperation::GoogleSignIn, e))?;

        self.set_session(&session);
        self.publish(AuthChangeEvent::SignedIn, Some(session.clone()));
        info!(user_id = %session.user.id, "OAuth sign-in complete");

        Ok(session)
    }

    /// Ask the provider to send the signup confirmation email again.
    pub async fn resend_verification(&self, email: &str) -> AuthResult<()> {
        self.provider
            .resend_signup_confirmation(email)
            .await
            .map_err(|e| fail(AuthOperation::ResendVerification, e))?;
        info!("Verification email resent");
        Ok(())
    }

    /// Refresh the session in the background whenever it nears expiry.
    ///
    /// Abort the returned handle to stop the ticker.
    pub fn spawn_auto_refresh(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(failure) = service.get_session().await {
                    debug!(code = %failure.code, "Auto refresh tick failed");
                }
            }
        })
    }
}
