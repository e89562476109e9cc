//! Expiry-aware access to the persisted primary token.

use crate::clock::{Clock, SystemClock};
use crate::identity_provider::TokenEndpoint;
use crate::{SessionError, SessionResult};
use chrono::{DateTime, Duration, Utc};
use crewdesk_storage::{TokenRecord, TokenVault};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default window before expiry at which the primary token is renewed.
pub fn default_refresh_threshold() -> Duration {
    Duration::minutes(5)
}

/// Owns retrieval and conditional refresh of the primary access token.
///
/// Concurrent callers that all find the token due will each issue their own
/// refresh request; there is no single-flight coalescing here.
pub struct PrimaryTokenManager {
    vault: Arc<TokenVault>,
    endpoint: Arc<dyn TokenEndpoint>,
    clock: Arc<dyn Clock>,
    scope: String,
    refresh_threshold: Duration,
}

impl PrimaryTokenManager {
    pub fn new(
        vault: Arc<TokenVault>,
        endpoint: Arc<dyn TokenEndpoint>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            vault,
            endpoint,
            clock: Arc::new(SystemClock),
            scope: scope.into(),
            refresh_threshold: default_refresh_threshold(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_refresh_threshold(mut self, threshold: Duration) -> Self {
        self.refresh_threshold = threshold;
        self
    }

    pub fn vault(&self) -> &Arc<TokenVault> {
        &self.vault
    }

    pub fn refresh_threshold(&self) -> Duration {
        self.refresh_threshold
    }

    /// True once the current time has reached `expires_at - threshold`.
    pub fn is_refresh_due(&self, expires_at: DateTime<Utc>) -> bool {
        match expires_at.checked_sub_signed(self.refresh_threshold) {
            Some(refresh_at) => self.clock.now() >= refresh_at,
            None => true,
        }
    }

    /// Return a usable primary access token, refreshing it first if due.
    ///
    /// - `Ok(None)`: no session, or no refresh token to renew it with
    /// - `Err(RefreshFailed)`: the token endpoint rejected the refresh token
    ///   or returned an unusable lifetime; persisted tokens are left
    ///   untouched and the caller decides whether to sign out
    ///
    /// Storage read failures count as "no session".
    pub async fn get_valid_access_token(&self) -> SessionResult<Option<String>> {
        match self.resolve().await? {
            AccessTokenStatus::Valid(token) => Ok(Some(token)),
            AccessTokenStatus::Refreshed(record) => {
                self.persist(&record)?;
                Ok(Some(record.access_token))
            }
            AccessTokenStatus::NoSession => Ok(None),
        }
    }

    /// Like [`get_valid_access_token`](Self::get_valid_access_token) but a
    /// refreshed record is handed back unpersisted, so the caller can decide
    /// whether it is still wanted.
    pub(crate) async fn resolve(&self) -> SessionResult<AccessTokenStatus> {
        let expires_at = match self.vault.expires_at() {
            Ok(Some(expires_at)) => expires_at,
            Ok(None) => {
                debug!("No persisted token expiry, no session");
                return Ok(AccessTokenStatus::NoSession);
            }
            Err(e) => {
                warn!(error = %e, "Could not read token expiry, treating as no session");
                return Ok(AccessTokenStatus::NoSession);
            }
        };

        if !self.is_refresh_due(expires_at) {
            match self.vault.access_token() {
                Ok(Some(token)) => {
                    debug!(expires_at = %expires_at, "Primary token still valid");
                    return Ok(AccessTokenStatus::Valid(token));
                }
                Ok(None) => {
                    debug!("Expiry present but access token missing, refreshing");
                }
                Err(e) => {
                    warn!(error = %e, "Could not read access token, treating as no session");
                    return Ok(AccessTokenStatus::NoSession);
                }
            }
        }

        let Some(refresh_token) = self.stored_refresh_token() else {
            info!("Primary token due for refresh but no refresh token is stored");
            return Ok(AccessTokenStatus::NoSession);
        };

        self.refresh(&refresh_token)
            .await
            .map(AccessTokenStatus::Refreshed)
    }

    /// The persisted refresh token, if one can be read.
    pub fn stored_refresh_token(&self) -> Option<String> {
        match self.vault.refresh_token() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Could not read refresh token");
                None
            }
        }
    }

    /// Persist a freshly issued token triple.
    pub fn persist(&self, record: &TokenRecord) -> SessionResult<()> {
        self.vault.save_record(record)?;
        debug!(expires_at = %record.expires_at_utc, "Persisted primary token");
        Ok(())
    }

    /// Persist the token triple of a new session, dropping any refresh token
    /// the previous session left behind.
    pub fn replace(&self, record: &TokenRecord) -> SessionResult<()> {
        self.vault.replace_record(record)?;
        debug!(expires_at = %record.expires_at_utc, "Persisted new primary session");
        Ok(())
    }

    /// Best-effort removal of every persisted token. Returns the number of
    /// keys that could not be deleted.
    pub fn clear(&self) -> usize {
        self.vault.clear()
    }

    async fn refresh(&self, refresh_token: &str) -> SessionResult<TokenRecord> {
        // Expiry is anchored to when the request went out, not when the
        // response arrived.
        let requested_at = self.clock.now();

        info!("Refreshing primary access token");

        let grant = self
            .endpoint
            .redeem_refresh_token(refresh_token, &self.scope)
            .await
            .map_err(|e| match e {
                SessionError::EndpointRejected { status, detail, .. } => {
                    SessionError::RefreshFailed(format!("HTTP {}: {}", status, detail))
                }
                SessionError::Http(e) if e.is_decode() => {
                    SessionError::RefreshFailed(format!("malformed token response: {}", e))
                }
                other => other,
            })?;

        let Some(expires_at_utc) = expiry_after(requested_at, grant.expires_in) else {
            warn!(expires_in = grant.expires_in, "Token endpoint returned an unusable lifetime");
            return Err(SessionError::RefreshFailed(format!(
                "invalid expires_in: {}",
                grant.expires_in
            )));
        };

        let record = TokenRecord {
            expires_at_utc,
            refresh_token: grant.refresh_token.filter(|t| !t.is_empty()),
            access_token: grant.access_token,
        };

        info!(
            expires_at = %record.expires_at_utc,
            refresh_token_rotated = record.refresh_token.is_some(),
            "Primary access token refreshed"
        );

        Ok(record)
    }
}

/// Absolute expiry `expires_in` seconds after `issued_at`. `None` for a
/// non-positive lifetime or one outside the representable range.
pub fn expiry_after(issued_at: DateTime<Utc>, expires_in: i64) -> Option<DateTime<Utc>> {
    if expires_in <= 0 {
        return None;
    }
    issued_at.checked_add_signed(Duration::try_seconds(expires_in)?)
}

/// Outcome of [`PrimaryTokenManager::resolve`].
pub(crate) enum AccessTokenStatus {
    Valid(String),
    /// Refreshed but not yet persisted.
    Refreshed(TokenRecord),
    NoSession,
}
