//! In-memory authentication state for the portal's views.
//!
//! This crate provides:
//! - [`AuthContext`], the single owner of user/session/loading state, fed by
//!   the auth service's change events
//! - [`SessionHandle`], the cloneable handle views use to read that state and
//!   run auth operations
//! - The route guard deciding what a path renders for a given state

mod auth_fsm;
mod context;
mod guard;

pub use auth_fsm::context_machine;
pub use auth_fsm::{AuthPhase, ContextMachine, ContextMachineInput, ContextMachineState};
pub use context::{
    AuthContext, AuthSnapshot, MountOptions, SessionHandle, DEFAULT_AUTO_REFRESH_INTERVAL,
};
pub use guard::{
    guard_protected, guard_public_entry, resolve_route, GuardDecision, DASHBOARD_PATH, LOGIN_PATH,
    ROOT_PATH, SIGNUP_PATH, VERIFY_EMAIL_PATH,
};
