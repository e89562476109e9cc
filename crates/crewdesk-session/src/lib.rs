//! Client-side session core: primary token lifecycle, secondary token
//! exchange and session bootstrap.
//!
//! [`SessionBootstrapper`] is the entry point. It drives
//! [`PrimaryTokenManager`] and [`SecondaryTokenExchanger`], reads the
//! profile, role metadata and roster through a [`DirectoryApi`], and
//! publishes the result as a [`SessionState`].

mod authorizer;
mod bootstrapper;
mod clock;
mod directory;
mod error;
mod exchanger;
mod identity_provider;
mod model;
mod session_fsm;
mod state;
mod token_manager;

#[cfg(test)]
mod tests;

pub use authorizer::{AuthorizationGrant, Authorizer, StaticAuthorizer};
pub use bootstrapper::SessionBootstrapper;
pub use clock::{Clock, SystemClock};
pub use directory::{DirectoryApi, HttpDirectoryClient};
pub use error::{SessionError, SessionResult};
pub use exchanger::{SecondaryToken, SecondaryTokenExchanger};
pub use identity_provider::{IdentityProviderClient, TokenEndpoint, TokenGrant};
pub use model::{
    find_roster_entry, merge_profile, Profile, ProviderProfile, RoleMetadata, RosterEntry,
};
pub use session_fsm::{SessionMachine, SessionMachineInput, SessionMachineState, SessionPhase};
pub use state::SessionState;
pub use token_manager::{default_refresh_threshold, expiry_after, PrimaryTokenManager};
