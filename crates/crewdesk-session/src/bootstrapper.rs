//! Session bootstrap orchestration.
//!
//! The bootstrapper owns the session FSM and the published [`SessionState`].
//! Every bootstrap (`login`, `check_auth_status`) takes an attempt number;
//! `logout` advances it. A bootstrap only commits while its attempt is still
//! current, so a slow bootstrap cannot bring back a session that was signed
//! out while it was in flight.

use crate::authorizer::Authorizer;
use crate::clock::Clock;
use crate::directory::{DirectoryApi, HttpDirectoryClient};
use crate::exchanger::{SecondaryToken, SecondaryTokenExchanger};
use crate::identity_provider::{IdentityProviderClient, TokenEndpoint};
use crate::model::{merge_profile, Profile, RoleMetadata, RosterEntry};
use crate::session_fsm::{SessionMachine, SessionMachineInput, SessionPhase};
use crate::state::SessionState;
use crate::token_manager::{default_refresh_threshold, AccessTokenStatus, PrimaryTokenManager};
use crate::{SessionError, SessionResult};
use chrono::Duration;
use crewdesk_config::Config;
use crewdesk_storage::{TokenRecord, TokenVault};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Fully assembled session, ready to commit.
struct Assembled {
    identity: Profile,
    secondary_token: Option<SecondaryToken>,
    metadata: Option<Vec<RoleMetadata>>,
    roster: Option<Vec<RosterEntry>>,
}

/// Outcome of revalidating a persisted session.
enum Revalidated {
    Ready(Assembled),
    /// No usable primary token.
    NoSession,
    /// Tokens are present but there is no refresh token to derive the
    /// secondary token from; the partial session is discarded.
    MissingRefreshToken,
}

struct Inner {
    fsm: SessionMachine,
    attempt: u64,
}

/// Owns one user session: token lifecycle, bootstrap and teardown.
pub struct SessionBootstrapper {
    tokens: PrimaryTokenManager,
    exchanger: SecondaryTokenExchanger,
    authorizer: Arc<dyn Authorizer>,
    directory: Arc<dyn DirectoryApi>,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<SessionState>,
}

impl SessionBootstrapper {
    pub fn new(
        tokens: PrimaryTokenManager,
        exchanger: SecondaryTokenExchanger,
        authorizer: Arc<dyn Authorizer>,
        directory: Arc<dyn DirectoryApi>,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::default());
        Self {
            tokens,
            exchanger,
            authorizer,
            directory,
            inner: Mutex::new(Inner {
                fsm: SessionMachine::new(),
                attempt: 0,
            }),
            state_tx,
        }
    }

    /// Wire up the HTTP identity provider and directory clients from config.
    pub fn from_config(
        config: &Config,
        vault: Arc<TokenVault>,
        authorizer: Arc<dyn Authorizer>,
        clock: Arc<dyn Clock>,
    ) -> SessionResult<Self> {
        let endpoint: Arc<dyn TokenEndpoint> =
            Arc::new(IdentityProviderClient::from_config(config)?);
        let directory: Arc<dyn DirectoryApi> = Arc::new(HttpDirectoryClient::from_config(config)?);
        let threshold = Duration::from_std(config.refresh_threshold())
            .unwrap_or_else(|_| default_refresh_threshold());

        let tokens = PrimaryTokenManager::new(vault, endpoint.clone(), &config.primary_scope)
            .with_clock(clock)
            .with_refresh_threshold(threshold);
        let exchanger = SecondaryTokenExchanger::new(endpoint, &config.secondary_scope);

        Ok(Self::new(tokens, exchanger, authorizer, directory))
    }

    pub fn tokens(&self) -> &PrimaryTokenManager {
        &self.tokens
    }

    /// Receive a snapshot every time the session state is published.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state_tx.borrow().clone()
    }

    pub fn phase(&self) -> SessionPhase {
        SessionPhase::from(self.inner.lock().fsm.state())
    }

    /// Interactive sign-in followed by a full bootstrap.
    ///
    /// Fails if authorization or the profile fetch fails; the session is then
    /// signed out and any tokens persisted by this attempt are discarded.
    /// A failed secondary exchange does not fail the login.
    pub async fn login(&self) -> SessionResult<()> {
        let attempt = self.begin(SessionMachineInput::Login)?;
        info!(attempt, "Starting login");

        let record = match self.authorizer.authorize().await {
            Ok(grant) => grant.into_record(),
            Err(e) => return self.abort(attempt, e),
        };

        if let Err(e) = self.persist_if_current(attempt, |tokens| tokens.replace(&record)) {
            return self.abort(attempt, e);
        }

        match self.assemble_login(&record).await {
            Ok(assembled) => self.commit(attempt, assembled),
            Err(e) => {
                self.discard_tokens_if_current(attempt);
                self.abort(attempt, e)
            }
        }
    }

    /// Restore a persisted session, typically once at startup or on resume.
    ///
    /// Without a usable token this ends signed out and returns `Ok`. Anything
    /// already held in memory (secondary token, metadata, roster, identity)
    /// is reused rather than fetched again. Any error forces a logout.
    pub async fn check_auth_status(&self) -> SessionResult<()> {
        let attempt = self.begin(SessionMachineInput::CheckStatus)?;
        debug!(attempt, "Checking persisted session");

        match self.revalidate(attempt).await {
            Ok(Revalidated::Ready(assembled)) => self.commit(attempt, assembled),
            Ok(Revalidated::NoSession) => {
                self.finish_without_session(attempt, false);
                Ok(())
            }
            Ok(Revalidated::MissingRefreshToken) => {
                info!("Persisted session has no refresh token, signing out");
                self.finish_without_session(attempt, true);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, transient = e.is_transient(), "Session check failed, forcing logout");
                self.force_logout_if_current(attempt, &e);
                Err(e)
            }
        }
    }

    /// Clear persisted tokens and reset the session. Never fails; storage
    /// errors while clearing are logged.
    pub fn logout(&self) {
        self.reset(None);
        info!("Signed out");
    }

    /// Re-derive the secondary token and refetch just the roster.
    ///
    /// On failure the existing roster stays in place.
    pub async fn refresh_roster(&self) -> SessionResult<Vec<RosterEntry>> {
        let attempt = {
            let mut inner = self.inner.lock();
            self.transition(&mut inner, SessionMachineInput::RosterRefresh)?;
            self.publish(&inner, |_| {});
            inner.attempt
        };

        let result = self.fetch_fresh_roster().await;

        let mut inner = self.inner.lock();
        if inner.attempt != attempt {
            debug!("Session ended during roster refresh, discarding result");
            return Err(SessionError::NotSignedIn);
        }

        match result {
            Ok((secondary_token, roster)) => {
                self.transition(&mut inner, SessionMachineInput::RosterRefreshed)?;
                self.publish(&inner, |state| {
                    if let Some(identity) = state.identity.take() {
                        state.identity = Some(merge_profile(identity.provider(), Some(roster.as_slice())));
                    }
                    state.secondary_token = Some(secondary_token);
                    state.roster = Some(roster.clone());
                });
                info!(entries = roster.len(), "Roster refreshed");
                Ok(roster)
            }
            Err(e) => {
                self.transition(&mut inner, SessionMachineInput::RosterRefreshFailed)?;
                self.publish(&inner, |_| {});
                warn!(error = %e, "Roster refresh failed, keeping existing roster");
                Err(e)
            }
        }
    }

    async fn assemble_login(&self, record: &TokenRecord) -> SessionResult<Assembled> {
        let secondary_token = match record.refresh_token.as_deref() {
            Some(refresh_token) => self.exchange_or_degrade(refresh_token).await,
            None => {
                debug!("No refresh token issued, skipping secondary exchange");
                None
            }
        };

        let provider = self
            .directory
            .fetch_profile(&record.access_token)
            .await
            .map_err(|e| SessionError::fetch("profile", e))?;

        let (metadata, roster) = match &secondary_token {
            Some(token) => self.fetch_secondary_data(token, None, None).await,
            None => (None, None),
        };

        Ok(Assembled {
            identity: merge_profile(provider, roster.as_deref()),
            secondary_token,
            metadata,
            roster,
        })
    }

    async fn revalidate(&self, attempt: u64) -> SessionResult<Revalidated> {
        let access_token = match self.tokens.resolve().await? {
            AccessTokenStatus::Valid(token) => token,
            AccessTokenStatus::Refreshed(record) => {
                self.persist_if_current(attempt, |tokens| tokens.persist(&record))?;
                record.access_token
            }
            AccessTokenStatus::NoSession => return Ok(Revalidated::NoSession),
        };

        let cached = self.snapshot();

        let secondary_token = match cached.secondary_token {
            Some(token) => Some(token),
            None => match self.tokens.stored_refresh_token() {
                Some(refresh_token) => self.exchange_or_degrade(&refresh_token).await,
                None => return Ok(Revalidated::MissingRefreshToken),
            },
        };

        let (metadata, roster) = match &secondary_token {
            Some(token) => {
                self.fetch_secondary_data(token, cached.metadata, cached.roster)
                    .await
            }
            None => (cached.metadata, cached.roster),
        };

        let provider = match cached.identity {
            Some(identity) => identity.provider(),
            None => self
                .directory
                .fetch_profile(&access_token)
                .await
                .map_err(|e| SessionError::fetch("profile", e))?,
        };

        Ok(Revalidated::Ready(Assembled {
            identity: merge_profile(provider, roster.as_deref()),
            secondary_token,
            metadata,
            roster,
        }))
    }

    async fn fetch_fresh_roster(&self) -> SessionResult<(SecondaryToken, Vec<RosterEntry>)> {
        let refresh_token = self
            .tokens
            .stored_refresh_token()
            .ok_or(SessionError::NotSignedIn)?;
        let secondary_token = self.exchanger.exchange(&refresh_token).await?;
        let roster = self
            .directory
            .fetch_roster(secondary_token.access_token())
            .await
            .map_err(|e| SessionError::fetch("roster", e))?;
        Ok((secondary_token, roster))
    }

    async fn exchange_or_degrade(&self, refresh_token: &str) -> Option<SecondaryToken> {
        match self.exchanger.exchange(refresh_token).await {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(
                    error = %e,
                    transient = e.is_transient(),
                    "Secondary token unavailable, continuing without metadata and roster"
                );
                None
            }
        }
    }

    /// Fetch whichever of metadata and roster is not already held, in
    /// parallel. A failed fetch yields `None` for that source only.
    async fn fetch_secondary_data(
        &self,
        token: &SecondaryToken,
        metadata: Option<Vec<RoleMetadata>>,
        roster: Option<Vec<RosterEntry>>,
    ) -> (Option<Vec<RoleMetadata>>, Option<Vec<RosterEntry>>) {
        let metadata = async {
            match metadata {
                Some(cached) => Some(cached),
                None => degrade(
                    "metadata",
                    self.directory.fetch_metadata(token.access_token()).await,
                ),
            }
        };
        let roster = async {
            match roster {
                Some(cached) => Some(cached),
                None => degrade(
                    "roster",
                    self.directory.fetch_roster(token.access_token()).await,
                ),
            }
        };

        tokio::join!(metadata, roster)
    }

    /// A login drops whatever the previous session left in memory; a status
    /// check keeps it so cached sources are not fetched again.
    fn begin(&self, input: SessionMachineInput) -> SessionResult<u64> {
        let fresh_session = matches!(input, SessionMachineInput::Login);
        let mut inner = self.inner.lock();
        self.transition(&mut inner, input)?;
        inner.attempt += 1;
        self.publish(&inner, |state| {
            if fresh_session {
                *state = SessionState::default();
            }
            state.loading = true;
            state.error = None;
        });
        Ok(inner.attempt)
    }

    fn commit(&self, attempt: u64, assembled: Assembled) -> SessionResult<()> {
        let mut inner = self.inner.lock();
        if inner.attempt != attempt {
            debug!(attempt, current = inner.attempt, "Discarding stale bootstrap result");
            return Err(SessionError::NotSignedIn);
        }

        self.transition(&mut inner, SessionMachineInput::BootstrapSucceeded)?;
        let degraded = assembled.secondary_token.is_none()
            || assembled.metadata.is_none()
            || assembled.roster.is_none();
        let user_id = assembled.identity.id.clone();
        let roster_matched = assembled.identity.has_roster_attributes();

        self.publish(&inner, move |state| {
            *state = SessionState {
                identity: Some(assembled.identity),
                secondary_token: assembled.secondary_token,
                metadata: assembled.metadata,
                roster: assembled.roster,
                ..SessionState::default()
            };
        });

        info!(user_id = %user_id, degraded, roster_matched, "Session signed in");
        Ok(())
    }

    fn abort(&self, attempt: u64, error: SessionError) -> SessionResult<()> {
        let mut inner = self.inner.lock();
        if inner.attempt == attempt {
            if let Err(e) = self.transition(&mut inner, SessionMachineInput::BootstrapFailed) {
                warn!(error = %e, "Unexpected state on bootstrap failure");
            }
            let message = error.to_string();
            self.publish(&inner, move |state| {
                *state = SessionState {
                    error: Some(message),
                    ..SessionState::default()
                };
            });
        }
        warn!(attempt, error = %error, "Bootstrap failed");
        Err(error)
    }

    fn finish_without_session(&self, attempt: u64, clear_tokens: bool) {
        let mut inner = self.inner.lock();
        if inner.attempt != attempt {
            return;
        }
        if let Err(e) = self.transition(&mut inner, SessionMachineInput::NoSession) {
            warn!(error = %e, "Unexpected state on session check");
        }
        if clear_tokens {
            self.clear_tokens();
        }
        self.publish(&inner, |state| *state = SessionState::default());
        debug!("No session to restore");
    }

    /// Run `write` against the token store only while `attempt` is current.
    /// The lock is held across the write so a logout cannot interleave.
    fn persist_if_current(
        &self,
        attempt: u64,
        write: impl FnOnce(&PrimaryTokenManager) -> SessionResult<()>,
    ) -> SessionResult<()> {
        let inner = self.inner.lock();
        if inner.attempt != attempt {
            debug!(attempt, current = inner.attempt, "Session reset in flight, dropping tokens");
            return Err(SessionError::NotSignedIn);
        }
        write(&self.tokens)
    }

    fn discard_tokens_if_current(&self, attempt: u64) {
        let inner = self.inner.lock();
        if inner.attempt == attempt {
            self.clear_tokens();
        }
    }

    fn force_logout_if_current(&self, attempt: u64, error: &SessionError) {
        let mut inner = self.inner.lock();
        if inner.attempt != attempt {
            debug!("Session already reset, skipping forced logout");
            return;
        }
        self.reset_locked(&mut inner, Some(error.to_string()));
    }

    fn reset(&self, error: Option<String>) {
        let mut inner = self.inner.lock();
        self.reset_locked(&mut inner, error);
    }

    /// Advance the attempt, clear persisted tokens and publish the initial
    /// state. Storage access happens under the lock so that a concurrent
    /// bootstrap cannot persist between the reset and the clear.
    fn reset_locked(&self, inner: &mut Inner, error: Option<String>) {
        inner.attempt += 1;
        if let Err(e) = self.transition(inner, SessionMachineInput::Logout) {
            warn!(error = %e, "Unexpected state on logout");
        }
        self.clear_tokens();
        self.publish(inner, move |state| {
            *state = SessionState {
                error,
                ..SessionState::default()
            };
        });
    }

    fn clear_tokens(&self) {
        let failures = self.tokens.clear();
        if failures > 0 {
            warn!(failures, "Some persisted tokens could not be cleared");
        }
    }

    fn transition(&self, inner: &mut Inner, input: SessionMachineInput) -> SessionResult<()> {
        let old_phase = SessionPhase::from(inner.fsm.state());
        inner.fsm.consume(&input).map_err(|_| {
            SessionError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                inner.fsm.state()
            ))
        })?;
        let new_phase = SessionPhase::from(inner.fsm.state());
        if old_phase != new_phase {
            debug!(old_phase = ?old_phase, new_phase = ?new_phase, "Session state transition");
        }
        Ok(())
    }

    /// Apply `update` and publish, stamping the phase from the FSM.
    fn publish(&self, inner: &Inner, update: impl FnOnce(&mut SessionState)) {
        let phase = SessionPhase::from(inner.fsm.state());
        self.state_tx.send_modify(|state| {
            update(state);
            state.phase = phase;
        });
    }
}

fn degrade<T>(source_name: &'static str, result: SessionResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(
                source = source_name,
                error = %SessionError::fetch(source_name, e),
                "Fetch failed, continuing without it"
            );
            None
        }
    }
}
