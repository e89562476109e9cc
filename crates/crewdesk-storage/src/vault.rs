//! Primary token persistence.

use crate::{SecureStorage, StorageError, StorageKeys, StorageResult};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;
use tracing::{debug, warn};

/// The persisted primary token.
///
/// `expires_at_utc` is always an absolute instant. Relative `expires_in`
/// values from the provider are converted before a record is built.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at_utc: DateTime<Utc>,
}

impl fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRecord")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expires_at_utc", &self.expires_at_utc)
            .finish()
    }
}

/// Typed access to the three primary-token keys.
///
/// There is no locking and no cross-key transaction: each accessor is one
/// storage call.
pub struct TokenVault {
    storage: Box<dyn SecureStorage>,
}

impl TokenVault {
    /// Create a vault over the given storage backend.
    pub fn new(storage: Box<dyn SecureStorage>) -> Self {
        Self { storage }
    }

    pub fn access_token(&self) -> StorageResult<Option<String>> {
        self.storage.get(StorageKeys::ACCESS_TOKEN)
    }

    pub fn set_access_token(&self, token: &str) -> StorageResult<()> {
        self.storage.set(StorageKeys::ACCESS_TOKEN, token)
    }

    pub fn refresh_token(&self) -> StorageResult<Option<String>> {
        Ok(self
            .storage
            .get(StorageKeys::REFRESH_TOKEN)?
            .filter(|token| !token.is_empty()))
    }

    pub fn set_refresh_token(&self, token: &str) -> StorageResult<()> {
        self.storage.set(StorageKeys::REFRESH_TOKEN, token)
    }

    /// Parsed absolute expiry, if one is stored.
    pub fn expires_at(&self) -> StorageResult<Option<DateTime<Utc>>> {
        match self.storage.get(StorageKeys::EXPIRES_AT)? {
            Some(raw) => {
                let parsed = DateTime::parse_from_rfc3339(raw.trim())
                    .map_err(|e| StorageError::Encoding(format!("expires_at: {}", e)))?;
                Ok(Some(parsed.with_timezone(&Utc)))
            }
            None => Ok(None),
        }
    }

    pub fn set_expires_at(&self, expires_at: &DateTime<Utc>) -> StorageResult<()> {
        let encoded = expires_at.to_rfc3339_opts(SecondsFormat::Millis, true);
        self.storage.set(StorageKeys::EXPIRES_AT, &encoded)
    }

    /// Persist a full record.
    ///
    /// The refresh token is only written when present, so a provider that
    /// reuses its refresh token never clears the stored one. Expiry is
    /// written last: a torn write reads back as "no session" (first login)
    /// or "due for refresh" (stale expiry), never as a fresh expiry for an
    /// old token.
    pub fn save_record(&self, record: &TokenRecord) -> StorageResult<()> {
        self.set_access_token(&record.access_token)?;
        if let Some(refresh_token) = record.refresh_token.as_deref().filter(|t| !t.is_empty()) {
            self.set_refresh_token(refresh_token)?;
        }
        self.set_expires_at(&record.expires_at_utc)?;
        debug!(expires_at = %record.expires_at_utc, "Token record saved");
        Ok(())
    }

    /// Persist a record that starts a new session.
    ///
    /// Unlike [`save_record`](Self::save_record), a record without a refresh
    /// token removes any refresh token left by an earlier session.
    pub fn replace_record(&self, record: &TokenRecord) -> StorageResult<()> {
        if record.refresh_token.as_deref().map_or(true, str::is_empty) {
            self.storage.delete(StorageKeys::REFRESH_TOKEN)?;
        }
        self.save_record(record)
    }

    /// Load the record; `None` unless both access token and expiry exist.
    pub fn load_record(&self) -> StorageResult<Option<TokenRecord>> {
        let Some(expires_at_utc) = self.expires_at()? else {
            return Ok(None);
        };
        let Some(access_token) = self.access_token()? else {
            return Ok(None);
        };
        Ok(Some(TokenRecord {
            access_token,
            refresh_token: self.refresh_token()?,
            expires_at_utc,
        }))
    }

    /// Whether an access token and its expiry are both stored.
    pub fn has_session(&self) -> StorageResult<bool> {
        Ok(self.storage.has(StorageKeys::EXPIRES_AT)?
            && self.storage.has(StorageKeys::ACCESS_TOKEN)?)
    }

    /// Delete every token key, continuing past failures.
    ///
    /// Returns the number of keys whose delete failed.
    pub fn clear(&self) -> usize {
        let mut failures = 0;
        for key in StorageKeys::ALL {
            if let Err(e) = self.storage.delete(key) {
                warn!(key = %key, error = %e, "Failed to delete token key");
                failures += 1;
            }
        }
        failures
    }
}
