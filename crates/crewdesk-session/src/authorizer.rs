//! Seam for the external interactive authorization flow.

use crate::{SessionError, SessionResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crewdesk_storage::TokenRecord;
use std::fmt;

/// Token triple produced by an authorization flow. Unlike the refresh
/// endpoint, the expiry here is already absolute.
#[derive(Clone)]
pub struct AuthorizationGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub access_token_expiration: DateTime<Utc>,
}

impl AuthorizationGrant {
    pub fn into_record(self) -> TokenRecord {
        TokenRecord {
            access_token: self.access_token,
            refresh_token: self.refresh_token.filter(|t| !t.is_empty()),
            expires_at_utc: self.access_token_expiration,
        }
    }
}

impl fmt::Debug for AuthorizationGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationGrant")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("access_token_expiration", &self.access_token_expiration)
            .finish()
    }
}

/// Runs the interactive sign-in and returns the initial tokens.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(&self) -> SessionResult<AuthorizationGrant>;
}

/// Hands back a grant obtained out of band.
#[derive(Debug, Clone)]
pub struct StaticAuthorizer {
    grant: AuthorizationGrant,
}

impl StaticAuthorizer {
    pub fn new(grant: AuthorizationGrant) -> Self {
        Self { grant }
    }
}

#[async_trait]
impl Authorizer for StaticAuthorizer {
    async fn authorize(&self) -> SessionResult<AuthorizationGrant> {
        if self.grant.access_token.trim().is_empty() {
            return Err(SessionError::Authorization(
                "no access token supplied".to_string(),
            ));
        }
        Ok(self.grant.clone())
    }
}
