//! The auth context: single owner of the in-memory session state.
//!
//! Mounting registers one subscription on the service, starts a listener
//! that applies every change event, and fetches the current session once.
//! State is published through a `watch` channel; [`SessionHandle`]s read it
//! and run auth operations on behalf of views.

use crate::auth_fsm::{AuthPhase, ContextMachine, ContextMachineInput};
use auth_engine::{
    AuthResult, AuthService, AuthStateChange, AuthSubscription, Session, SignUpOutcome, User,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

/// How often the background refresher checks the session.
pub const DEFAULT_AUTO_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// The context's copy of the auth state.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSnapshot {
    pub user: Option<User>,
    pub session: Option<Session>,
    pub loading: bool,
    /// Sequence number of the last change event applied.
    pub seq: u64,
}

impl AuthSnapshot {
    fn initializing() -> Self {
        Self {
            user: None,
            session: None,
            loading: true,
            seq: 0,
        }
    }

    pub fn phase(&self) -> AuthPhase {
        if self.loading {
            AuthPhase::Initializing
        } else if self.user.is_some() {
            AuthPhase::Authenticated
        } else {
            AuthPhase::Unauthenticated
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.phase() == AuthPhase::Authenticated
    }
}

/// Options for [`AuthContext::mount`].
#[derive(Debug, Clone)]
pub struct MountOptions {
    /// Run the service's background refresher at this interval.
    pub auto_refresh: Option<Duration>,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            auto_refresh: Some(DEFAULT_AUTO_REFRESH_INTERVAL),
        }
    }
}

impl MountOptions {
    pub fn without_auto_refresh() -> Self {
        Self { auto_refresh: None }
    }
}

/// Applies fetch results and change events to the published state.
struct StateHolder {
    machine: Mutex<ContextMachine>,
    state: watch::Sender<AuthSnapshot>,
}

impl StateHolder {
    fn new(state: watch::Sender<AuthSnapshot>) -> Self {
        Self {
            machine: Mutex::new(ContextMachine::new()),
            state,
        }
    }

    /// Apply a change event. Always overwrites user and session.
    fn apply_change(&self, change: AuthStateChange) {
        let input = if change.session.is_some() {
            ContextMachineInput::SessionChanged
        } else {
            ContextMachineInput::SessionCleared
        };

        let mut machine = self.machine.lock();
        if machine.consume(&input).is_err() {
            warn!(input = ?input, state = ?machine.state(), "Change event rejected by context machine");
            return;
        }
        let phase = AuthPhase::from(machine.state());
        drop(machine);

        debug!(seq = change.seq, event = ?change.event, phase = ?phase, "Applying auth change");

        let AuthStateChange { seq, session, .. } = change;
        self.state.send_modify(|snapshot| {
            snapshot.user = session.as_ref().map(|s| s.user.clone());
            snapshot.session = session;
            snapshot.loading = false;
            snapshot.seq = snapshot.seq.max(seq);
        });
    }

    /// Apply the one-time fetch result, unless a change event got there first.
    fn apply_initial(&self, result: AuthResult<Option<Session>>) {
        let session = match result {
            Ok(session) => session,
            Err(failure) => {
                warn!(code = %failure.code, "Initial session fetch failed, treating as signed out");
                None
            }
        };

        let input = if session.is_some() {
            ContextMachineInput::SessionRestored
        } else {
            ContextMachineInput::NoSession
        };

        let mut machine = self.machine.lock();
        if machine.consume(&input).is_err() {
            debug!(state = ?machine.state(), "Initial session superseded by a change event, discarding");
            return;
        }
        let phase = AuthPhase::from(machine.state());
        drop(machine);

        info!(phase = ?phase, "Auth state initialized");

        self.state.send_modify(|snapshot| {
            snapshot.user = session.as_ref().map(|s| s.user.clone());
            snapshot.session = session;
            snapshot.loading = false;
        });
    }
}

/// Owns the auth state for the lifetime of the front end.
///
/// Dropping the context (or calling [`AuthContext::unmount`]) stops the
/// listener and the refresher and releases the subscription.
pub struct AuthContext {
    handle: SessionHandle,
    tasks: Vec<JoinHandle<()>>,
}

impl AuthContext {
    /// Mount the context. Must be called from within a tokio runtime.
    ///
    /// The state starts as loading and resolves once the initial fetch or a
    /// change event arrives; see [`SessionHandle::wait_until_resolved`].
    pub fn mount(service: Arc<AuthService>, options: MountOptions) -> Self {
        let subscription = service.subscribe();
        let (tx, rx) = watch::channel(AuthSnapshot::initializing());
        let holder = Arc::new(StateHolder::new(tx));

        let mut tasks = vec![tokio::spawn(listen(subscription, holder.clone()))];

        tasks.push(tokio::spawn({
            let service = service.clone();
            async move {
                let result = service.get_session().await;
                holder.apply_initial(result);
            }
        }));

        if let Some(interval) = options.auto_refresh {
            tasks.push(service.spawn_auto_refresh(interval));
        }

        debug!("Auth context mounted");

        Self {
            handle: SessionHandle { service, state: rx },
            tasks,
        }
    }

    /// A handle for views.
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Stop all background work and wait until it has been torn down.
    pub async fn unmount(mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
            let _ = task.await;
        }
        debug!("Auth context unmounted");
    }
}

impl Drop for AuthContext {
    fn drop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

async fn listen(mut subscription: AuthSubscription, holder: Arc<StateHolder>) {
    while let Some(change) = subscription.recv().await {
        holder.apply_change(change);
    }
    debug!("Auth change stream closed");
}

/// Cloneable access to the auth state and operations.
///
/// Operations that change the session return only after the context has
/// applied the resulting change, so a snapshot read right after a successful
/// sign-in already shows the user.
#[derive(Clone)]
pub struct SessionHandle {
    service: Arc<AuthService>,
    state: watch::Receiver<AuthSnapshot>,
}

impl SessionHandle {
    /// Current state.
    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    pub fn phase(&self) -> AuthPhase {
        self.state.borrow().phase()
    }

    /// Wait for the next state change. Returns false once the context is gone.
    pub async fn changed(&mut self) -> bool {
        self.state.changed().await.is_ok()
    }

    /// Wait until the initial state is known.
    pub async fn wait_until_resolved(&self) -> AuthSnapshot {
        let mut state = self.state.clone();
        let resolved = match state.wait_for(|snapshot| !snapshot.loading).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        };
        resolved
    }

    async fn settle(&self) {
        let target = self.service.last_seq();
        let mut state = self.state.clone();
        if state.wait_for(|snapshot| snapshot.seq >= target).await.is_err() {
            debug!(target, "Context gone before change was applied");
        }
    }

    /// Sign in with email and password.
    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<Session> {
        let session = self.service.sign_in(email, password).await?;
        self.settle().await;
        Ok(session)
    }

    /// Register a new account.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> AuthResult<SignUpOutcome> {
        let outcome = self.service.sign_up(email, password, display_name).await?;
        if outcome.session.is_some() {
            self.settle().await;
        }
        Ok(outcome)
    }

    /// Start Google sign-in; returns the consent URL.
    pub fn sign_in_with_google(&self, redirect_to: &str) -> AuthResult<Url> {
        self.service.sign_in_with_google(redirect_to)
    }

    /// Finish Google sign-in with the code from the redirect.
    pub async fn complete_oauth(&self, auth_code: &str) -> AuthResult<Session> {
        let session = self.service.exchange_code_for_session(auth_code).await?;
        self.settle().await;
        Ok(session)
    }

    /// Resend the signup confirmation email.
    pub async fn resend_verification(&self, email: &str) -> AuthResult<()> {
        self.service.resend_verification(email).await
    }

    /// Re-read the user from the provider.
    pub async fn refresh_user(&self) -> AuthResult<Option<User>> {
        let user = self.service.get_user().await?;
        self.settle().await;
        Ok(user)
    }

    /// Sign out.
    pub async fn sign_out(&self) -> AuthResult<()> {
        self.service.sign_out().await?;
        self.settle().await;
        Ok(())
    }
}
