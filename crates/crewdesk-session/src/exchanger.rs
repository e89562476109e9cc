//! Secondary (resource-scoped) token derivation.

use crate::identity_provider::TokenEndpoint;
use crate::{SessionError, SessionResult};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Access token for the content store. Held in memory only.
#[derive(Clone, PartialEq, Eq)]
pub struct SecondaryToken {
    access_token: String,
}

impl SecondaryToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl fmt::Debug for SecondaryToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecondaryToken")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Exchanges the primary refresh token for a token scoped to the secondary
/// resource. Nothing is persisted; callers re-derive per bootstrap pass.
pub struct SecondaryTokenExchanger {
    endpoint: Arc<dyn TokenEndpoint>,
    scope: String,
}

impl SecondaryTokenExchanger {
    pub fn new(endpoint: Arc<dyn TokenEndpoint>, scope: impl Into<String>) -> Self {
        Self {
            endpoint,
            scope: scope.into(),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub async fn exchange(&self, refresh_token: &str) -> SessionResult<SecondaryToken> {
        debug!(scope = %self.scope, "Exchanging refresh token for secondary token");

        // A rotated refresh token in the response is ignored; the primary one
        // stays authoritative.
        let grant = self
            .endpoint
            .redeem_refresh_token(refresh_token, &self.scope)
            .await
            .map_err(|e| SessionError::ExchangeFailed(e.to_string()))?;

        Ok(SecondaryToken::new(grant.access_token))
    }
}
