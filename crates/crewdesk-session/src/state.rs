//! The externally observed session.

use crate::exchanger::SecondaryToken;
use crate::model::{Profile, RoleMetadata, RosterEntry};
use crate::session_fsm::SessionPhase;
use serde::Serialize;

/// Snapshot of the session as consumers see it.
///
/// `identity` is set only after a bootstrap completed since the last
/// logout. The secondary token never leaves the process.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub phase: SessionPhase,
    pub identity: Option<Profile>,
    #[serde(skip)]
    pub secondary_token: Option<SecondaryToken>,
    pub metadata: Option<Vec<RoleMetadata>>,
    pub roster: Option<Vec<RosterEntry>>,
    pub loading: bool,
    pub error: Option<String>,
}

impl SessionState {
    pub fn is_signed_in(&self) -> bool {
        self.phase.is_signed_in() && self.identity.is_some()
    }

    pub fn has_secondary_token(&self) -> bool {
        self.secondary_token.is_some()
    }
}
