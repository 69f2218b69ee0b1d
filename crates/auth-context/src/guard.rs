//! Route guard: what a path renders for a given auth state.
//!
//! Pure functions of the snapshot; callers re-evaluate on the next state
//! change instead of retrying.

use crate::auth_fsm::AuthPhase;
use crate::context::AuthSnapshot;

pub const ROOT_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";
pub const SIGNUP_PATH: &str = "/signup";
pub const VERIFY_EMAIL_PATH: &str = "/verify-email";
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Outcome of a guard evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// State not known yet; show a placeholder.
    Loading,
    /// Show the requested view.
    Render,
    /// Navigate elsewhere instead.
    Redirect { to: &'static str },
}

/// Guard for views that require a signed-in user.
pub fn guard_protected(snapshot: &AuthSnapshot) -> GuardDecision {
    match snapshot.phase() {
        AuthPhase::Initializing => GuardDecision::Loading,
        AuthPhase::Authenticated => GuardDecision::Render,
        AuthPhase::Unauthenticated => GuardDecision::Redirect { to: LOGIN_PATH },
    }
}

/// Guard for the login and signup entry points: signed-in visitors go to
/// the dashboard.
pub fn guard_public_entry(snapshot: &AuthSnapshot) -> GuardDecision {
    match snapshot.phase() {
        AuthPhase::Initializing => GuardDecision::Loading,
        AuthPhase::Authenticated => GuardDecision::Redirect { to: DASHBOARD_PATH },
        AuthPhase::Unauthenticated => GuardDecision::Render,
    }
}

/// Route table of the portal.
pub fn resolve_route(path: &str, snapshot: &AuthSnapshot) -> GuardDecision {
    match path {
        ROOT_PATH => GuardDecision::Redirect { to: LOGIN_PATH },
        LOGIN_PATH | SIGNUP_PATH => guard_public_entry(snapshot),
        DASHBOARD_PATH => guard_protected(snapshot),
        VERIFY_EMAIL_PATH => GuardDecision::Render,
        _ => GuardDecision::Redirect { to: LOGIN_PATH },
    }
}
