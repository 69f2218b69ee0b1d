//! Context state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//!                ┌─────────────────┐
//!                │  Initializing   │ (initial, loading)
//!                └────────┬────────┘
//!   SessionRestored /     │      NoSession /
//!   SessionChanged        │      SessionCleared
//!          ┌──────────────┴──────────────┐
//!          ▼                             ▼
//! ┌─────────────────┐  SessionCleared  ┌─────────────────┐
//! │  Authenticated  │ ───────────────► │ Unauthenticated │
//! │                 │ ◄─────────────── │                 │
//! └─────────────────┘  SessionChanged  └─────────────────┘
//! ```
//!
//! `SessionRestored` and `NoSession` come from the one-time fetch at mount
//! and are only accepted while initializing: once a change event has
//! resolved the state, a late fetch result is rejected by the machine.

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub context_machine(Initializing)

    Initializing => {
        SessionRestored => Authenticated,
        NoSession => Unauthenticated,
        SessionChanged => Authenticated,
        SessionCleared => Unauthenticated
    },
    Authenticated => {
        SessionChanged => Authenticated,
        SessionCleared => Unauthenticated
    },
    Unauthenticated => {
        SessionChanged => Authenticated,
        SessionCleared => Unauthenticated
    }
}

pub use context_machine::Input as ContextMachineInput;
pub use context_machine::State as ContextMachineState;
pub use context_machine::StateMachine as ContextMachine;

/// Coarse auth state consumed by guards and views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthPhase {
    /// The initial session fetch has not resolved yet.
    Initializing,
    /// A user is signed in.
    Authenticated,
    /// Nobody is signed in.
    Unauthenticated,
}

impl AuthPhase {
    pub fn is_loading(&self) -> bool {
        matches!(self, AuthPhase::Initializing)
    }
}

impl From<&ContextMachineState> for AuthPhase {
    fn from(state: &ContextMachineState) -> Self {
        match state {
            ContextMachineState::Initializing => AuthPhase::Initializing,
            ContextMachineState::Authenticated => AuthPhase::Authenticated,
            ContextMachineState::Unauthenticated => AuthPhase::Unauthenticated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let machine = ContextMachine::new();
        assert_eq!(AuthPhase::from(machine.state()), AuthPhase::Initializing);
    }

    #[test]
    fn test_fetch_resolves_initializing() {
        let mut machine = ContextMachine::new();
        machine.consume(&ContextMachineInput::SessionRestored).unwrap();
        assert_eq!(AuthPhase::from(machine.state()), AuthPhase::Authenticated);

        let mut machine = ContextMachine::new();
        machine.consume(&ContextMachineInput::NoSession).unwrap();
        assert_eq!(AuthPhase::from(machine.state()), AuthPhase::Unauthenticated);
    }

    #[test]
    fn test_late_fetch_result_is_rejected() {
        let mut machine = ContextMachine::new();
        machine.consume(&ContextMachineInput::SessionChanged).unwrap();

        assert!(machine.consume(&ContextMachineInput::NoSession).is_err());
        assert!(machine
            .consume(&ContextMachineInput::SessionRestored)
            .is_err());
        assert_eq!(AuthPhase::from(machine.state()), AuthPhase::Authenticated);
    }

    #[test]
    fn test_change_events_always_apply() {
        let mut machine = ContextMachine::new();
        machine.consume(&ContextMachineInput::SessionCleared).unwrap();
        machine.consume(&ContextMachineInput::SessionChanged).unwrap();
        machine.consume(&ContextMachineInput::SessionChanged).unwrap();
        assert_eq!(AuthPhase::from(machine.state()), AuthPhase::Authenticated);
        machine.consume(&ContextMachineInput::SessionCleared).unwrap();
        machine.consume(&ContextMachineInput::SessionCleared).unwrap();
        assert_eq!(AuthPhase::from(machine.state()), AuthPhase::Unauthenticated);
    }

    #[test]
    fn test_only_initializing_is_loading() {
        assert!(AuthPhase::Initializing.is_loading());
        assert!(!AuthPhase::Authenticated.is_loading());
        assert!(!AuthPhase::Unauthenticated.is_loading());
    }
}
