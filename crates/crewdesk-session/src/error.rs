//! Session error types.

use crewdesk_storage::StorageError;
use thiserror::Error;

/// Session error type.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The refresh endpoint rejected the refresh token. The session cannot
    /// be recovered and the caller must sign out.
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// Secondary token derivation failed. The session stays valid; features
    /// that need the secondary token degrade.
    #[error("Secondary token exchange failed: {0}")]
    ExchangeFailed(String),

    /// A profile, metadata or roster fetch failed.
    #[error("Failed to fetch {source_name}: {detail}")]
    FetchFailed {
        source_name: &'static str,
        detail: String,
    },

    /// Persistent storage could not be read or written.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] StorageError),

    /// An endpoint answered with a non-success status.
    #[error("{operation} rejected with HTTP {status}: {detail}")]
    EndpointRejected {
        operation: &'static str,
        status: u16,
        detail: String,
    },

    /// The external authorization flow failed or was cancelled.
    #[error("Authorization failed: {0}")]
    Authorization(String),

    /// No persisted session to operate on.
    #[error("Not signed in")]
    NotSignedIn,

    /// Invalid state transition in the session FSM
    #[error("Invalid session state transition: {0}")]
    InvalidStateTransition(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SessionError {
    /// Returns true if the failure looks temporary (network, timeout, 5xx).
    ///
    /// Nothing in this crate retries; this only feeds log context and lets
    /// callers word their message.
    pub fn is_transient(&self) -> bool {
        match self {
            SessionError::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                e.status().map(|s| s.is_server_error()).unwrap_or(false)
            }
            SessionError::EndpointRejected { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns true if the session cannot continue and must be signed out.
    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, SessionError::RefreshFailed(_))
    }

    pub(crate) fn fetch(source_name: &'static str, cause: SessionError) -> Self {
        match cause {
            already @ SessionError::FetchFailed { .. } => already,
            other => SessionError::FetchFailed {
                source_name,
                detail: other.to_string(),
            },
        }
    }
}

impl From<crewdesk_config::CoreError> for SessionError {
    fn from(e: crewdesk_config::CoreError) -> Self {
        SessionError::Config(e.to_string())
    }
}

/// Result type alias using SessionError.
pub type SessionResult<T> = Result<T, SessionError>;
