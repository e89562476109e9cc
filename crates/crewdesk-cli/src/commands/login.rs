//! `crewdesk login`

use std::sync::Arc;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use crewdesk_session::{expiry_after, AuthorizationGrant, StaticAuthorizer};

use crate::commands::print_state;
use crate::context::SessionContext;

/// Lifetime assumed when neither `--expires-at` nor `--expires-in` is given.
const DEFAULT_LIFETIME_SECS: i64 = 3600;

/// Absolute expiry from the flags, relative ones anchored at `now`.
///
/// A relative lifetime must be positive and land within the supported date
/// range.
pub fn resolve_expiry(
    expires_at: Option<DateTime<Utc>>,
    expires_in: Option<i64>,
    now: DateTime<Utc>,
) -> anyhow::Result<DateTime<Utc>> {
    match (expires_at, expires_in) {
        (Some(at), _) => Ok(at),
        (None, Some(secs)) => expiry_after(now, secs)
            .ok_or_else(|| anyhow!("invalid --expires-in {}: must be a positive number of seconds", secs)),
        (None, None) => expiry_after(now, DEFAULT_LIFETIME_SECS)
            .ok_or_else(|| anyhow!("cannot compute default expiry from {}", now)),
    }
}

pub async fn run(
    ctx: &SessionContext,
    access_token: String,
    refresh_token: Option<String>,
    expires_at: DateTime<Utc>,
) -> anyhow::Result<()> {
    let authorizer = StaticAuthorizer::new(AuthorizationGrant {
        access_token,
        refresh_token,
        access_token_expiration: expires_at,
    });
    let session = ctx.bootstrapper_with(Arc::new(authorizer))?;

    let result = session.login().await;
    print_state(&session.snapshot())?;
    result?;
    Ok(())
}
