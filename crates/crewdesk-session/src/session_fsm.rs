//! Session state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//!                 Login / CheckStatus
//! ┌─────────────┐ ──────────────────► ┌───────────────┐
//! │  SignedOut  │                     │ Bootstrapping │
//! └─────────────┘ ◄────────────────── └───────┬───────┘
//!        ▲          BootstrapFailed /         │ BootstrapSucceeded
//!        │          NoSession                 ▼
//!        │                             ┌─────────────┐  RosterRefresh  ┌──────────────────┐
//!        │          Logout (any state) │  SignedIn   │ ──────────────► │ RefreshingRoster │
//!        └──────────────────────────── └─────────────┘ ◄────────────── └──────────────────┘
//!                                                     RosterRefreshed /
//!                                                     RosterRefreshFailed
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(SignedOut)

    SignedOut => {
        Login => Bootstrapping,
        CheckStatus => Bootstrapping,
        Logout => SignedOut
    },
    Bootstrapping => {
        BootstrapSucceeded => SignedIn,
        BootstrapFailed => SignedOut,
        // No usable token: signed out without an error
        NoSession => SignedOut,
        Logout => SignedOut
    },
    SignedIn => {
        Login => Bootstrapping,
        // App resume re-runs the bootstrap with fetch-if-absent
        CheckStatus => Bootstrapping,
        RosterRefresh => RefreshingRoster,
        Logout => SignedOut
    },
    RefreshingRoster => {
        RosterRefreshed => SignedIn,
        // Stale roster is kept
        RosterRefreshFailed => SignedIn,
        Logout => SignedOut
    }
}

pub use session_machine::Input as SessionMachineInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// Consumer-facing view of the machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    SignedOut,
    Bootstrapping,
    SignedIn,
    RefreshingRoster,
}

impl SessionPhase {
    /// True while a usable identity is committed.
    pub fn is_signed_in(&self) -> bool {
        matches!(self, SessionPhase::SignedIn | SessionPhase::RefreshingRoster)
    }
}

impl From<&SessionMachineState> for SessionPhase {
    fn from(state: &SessionMachineState) -> Self {
        match state {
            SessionMachineState::SignedOut => SessionPhase::SignedOut,
            SessionMachineState::Bootstrapping => SessionPhase::Bootstrapping,
            SessionMachineState::SignedIn => SessionPhase::SignedIn,
            SessionMachineState::RefreshingRoster => SessionPhase::RefreshingRoster,
        }
    }
}
