//! In-memory fakes for session orchestration tests.
//!
//! - `ManualClock`: a clock the test moves by hand
//! - `RecordingTokenEndpoint`: scripted grants per scope, records every call,
//!   optional gate to hold a scope's request in flight
//! - `ScriptedDirectory`: scripted profile/metadata/roster, optional gate to
//!   hold the profile fetch in flight
//! - `Harness`: wires them to a `MemoryStorage`-backed vault

use crate::{
    AuthorizationGrant, Authorizer, Clock, DirectoryApi, PrimaryTokenManager, ProviderProfile,
    RoleMetadata, RosterEntry, SecondaryTokenExchanger, SessionBootstrapper, SessionError,
    SessionResult, StaticAuthorizer, TokenEndpoint, TokenGrant,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use crewdesk_storage::{MemoryStorage, TokenRecord, TokenVault};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub const PRIMARY_SCOPE: &str = "openid profile offline_access User.Read";
pub const SECONDARY_SCOPE: &str = "api://content/.default";

/// Fixed starting instant for every test.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).unwrap()
}

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// One call to the token endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct RedeemCall {
    pub refresh_token: String,
    pub scope: String,
}

#[derive(Clone)]
enum Scripted {
    Grant(TokenGrant),
    Reject(u16),
}

pub struct RecordingTokenEndpoint {
    calls: Mutex<Vec<RedeemCall>>,
    scripts: Mutex<HashMap<String, Scripted>>,
    /// Moves the clock while a request is "in flight".
    drift: Mutex<Option<(Arc<ManualClock>, Duration)>>,
    gates: Mutex<HashMap<String, Gate>>,
}

impl RecordingTokenEndpoint {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            scripts: Mutex::new(HashMap::new()),
            drift: Mutex::new(None),
            gates: Mutex::new(HashMap::new()),
        }
    }

    pub fn grant(&self, scope: &str, access_token: &str, refresh_token: Option<&str>, expires_in: i64) {
        let grant = TokenGrant {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.map(str::to_string),
            expires_in,
            token_type: Some("Bearer".to_string()),
            scope: Some(scope.to_string()),
        };
        self.scripts
            .lock()
            .unwrap()
            .insert(scope.to_string(), Scripted::Grant(grant));
    }

    pub fn reject(&self, scope: &str, status: u16) {
        self.scripts
            .lock()
            .unwrap()
            .insert(scope.to_string(), Scripted::Reject(status));
    }

    pub fn drift_clock(&self, clock: Arc<ManualClock>, by: Duration) {
        *self.drift.lock().unwrap() = Some((clock, by));
    }

    /// Hold every request for `scope` until the gate is released.
    pub fn hold(&self, scope: &str) -> Gate {
        let gate = Gate::new();
        self.gates
            .lock()
            .unwrap()
            .insert(scope.to_string(), gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<RedeemCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, scope: &str) -> usize {
        self.calls().iter().filter(|c| c.scope == scope).count()
    }
}

#[async_trait]
impl TokenEndpoint for RecordingTokenEndpoint {
    async fn redeem_refresh_token(
        &self,
        refresh_token: &str,
        scope: &str,
    ) -> SessionResult<TokenGrant> {
        self.calls.lock().unwrap().push(RedeemCall {
            refresh_token: refresh_token.to_string(),
            scope: scope.to_string(),
        });

        if let Some((clock, by)) = self.drift.lock().unwrap().as_ref() {
            clock.advance(*by);
        }

        let gate = self.gates.lock().unwrap().get(scope).cloned();
        if let Some(gate) = gate {
            gate.pass().await;
        }

        let scripted = self.scripts.lock().unwrap().get(scope).cloned();
        match scripted {
            Some(Scripted::Grant(grant)) => Ok(grant),
            Some(Scripted::Reject(status)) => Err(SessionError::EndpointRejected {
                operation: "token grant",
                status,
                detail: "invalid_grant".to_string(),
            }),
            None => Err(SessionError::EndpointRejected {
                operation: "token grant",
                status: 400,
                detail: "unscripted scope".to_string(),
            }),
        }
    }
}

/// One call to the directory.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryCall {
    pub source: &'static str,
    pub token: String,
}

/// Holds a fetch until the test releases it.
#[derive(Clone)]
pub struct Gate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl Gate {
    fn new() -> Self {
        Self {
            entered: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        }
    }

    async fn pass(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

pub struct ScriptedDirectory {
    profile: Mutex<Result<ProviderProfile, u16>>,
    metadata: Mutex<Result<Vec<RoleMetadata>, u16>>,
    roster: Mutex<Result<Vec<RosterEntry>, u16>>,
    calls: Mutex<Vec<DirectoryCall>>,
    profile_gate: Mutex<Option<Gate>>,
}

impl ScriptedDirectory {
    pub fn new() -> Self {
        Self {
            profile: Mutex::new(Ok(provider_profile())),
            metadata: Mutex::new(Ok(role_metadata())),
            roster: Mutex::new(Ok(roster())),
            calls: Mutex::new(Vec::new()),
            profile_gate: Mutex::new(None),
        }
    }

    pub fn fail_profile(&self, status: u16) {
        *self.profile.lock().unwrap() = Err(status);
    }

    pub fn fail_metadata(&self, status: u16) {
        *self.metadata.lock().unwrap() = Err(status);
    }

    pub fn fail_roster(&self, status: u16) {
        *self.roster.lock().unwrap() = Err(status);
    }

    pub fn set_roster(&self, roster: Vec<RosterEntry>) {
        *self.roster.lock().unwrap() = Ok(roster);
    }

    pub fn hold_profile(&self) -> Gate {
        let gate = Gate::new();
        *self.profile_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<DirectoryCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, source: &str) -> usize {
        self.calls().iter().filter(|c| c.source == source).count()
    }

    fn record(&self, source: &'static str, token: &str) {
        self.calls.lock().unwrap().push(DirectoryCall {
            source,
            token: token.to_string(),
        });
    }
}

fn rejected<T>(operation: &'static str, result: Result<T, u16>) -> SessionResult<T> {
    result.map_err(|status| SessionError::EndpointRejected {
        operation,
        status,
        detail: String::new(),
    })
}

#[async_trait]
impl DirectoryApi for ScriptedDirectory {
    async fn fetch_profile(&self, primary_token: &str) -> SessionResult<ProviderProfile> {
        self.record("profile", primary_token);
        let gate = self.profile_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        let result = self.profile.lock().unwrap().clone();
        rejected("profile fetch", result)
    }

    async fn fetch_metadata(&self, secondary_token: &str) -> SessionResult<Vec<RoleMetadata>> {
        self.record("metadata", secondary_token);
        let result = self.metadata.lock().unwrap().clone();
        rejected("metadata fetch", result)
    }

    async fn fetch_roster(&self, secondary_token: &str) -> SessionResult<Vec<RosterEntry>> {
        self.record("roster", secondary_token);
        let result = self.roster.lock().unwrap().clone();
        rejected("roster fetch", result)
    }
}

pub struct FailingAuthorizer;

#[async_trait]
impl Authorizer for FailingAuthorizer {
    async fn authorize(&self) -> SessionResult<AuthorizationGrant> {
        Err(SessionError::Authorization("user cancelled".to_string()))
    }
}

pub fn provider_profile() -> ProviderProfile {
    ProviderProfile {
        id: "u-1".to_string(),
        display_name: Some("Ada Lovelace".to_string()),
        user_principal_name: Some("A@X.com".to_string()),
        mail: None,
    }
}

pub fn role_metadata() -> Vec<RoleMetadata> {
    vec![RoleMetadata {
        role: "Lead".to_string(),
        description: Some("Team lead".to_string()),
        capabilities: vec!["approve".to_string()],
    }]
}

pub fn roster_entry(email: &str, role: &str) -> RosterEntry {
    RosterEntry {
        email: email.to_string(),
        role: vec![role.to_string()],
        team: Some("Ops".to_string()),
        approvers: vec!["boss@x.com".to_string()],
        active: Some(true),
    }
}

pub fn roster() -> Vec<RosterEntry> {
    vec![roster_entry("b@x.com", "Member"), roster_entry("a@x.com", "Lead")]
}

/// Grant as returned by the interactive flow, valid for an hour from t0.
pub fn login_grant(refresh_token: Option<&str>) -> AuthorizationGrant {
    AuthorizationGrant {
        access_token: "at1".to_string(),
        refresh_token: refresh_token.map(str::to_string),
        access_token_expiration: t0() + Duration::hours(1),
    }
}

pub struct Harness {
    pub storage: Arc<MemoryStorage>,
    pub vault: Arc<TokenVault>,
    pub clock: Arc<ManualClock>,
    pub endpoint: Arc<RecordingTokenEndpoint>,
    pub directory: Arc<ScriptedDirectory>,
}

impl Harness {
    /// Fakes with a working secondary exchange and directory.
    pub fn new() -> Self {
        let storage = Arc::new(MemoryStorage::new());
        let vault = Arc::new(TokenVault::new(Box::new(storage.clone())));
        let endpoint = Arc::new(RecordingTokenEndpoint::new());
        endpoint.grant(SECONDARY_SCOPE, "st1", None, 3600);

        Self {
            storage,
            vault,
            clock: Arc::new(ManualClock::new(t0())),
            endpoint,
            directory: Arc::new(ScriptedDirectory::new()),
        }
    }

    pub fn token_manager(&self) -> PrimaryTokenManager {
        PrimaryTokenManager::new(self.vault.clone(), self.endpoint.clone(), PRIMARY_SCOPE)
            .with_clock(self.clock.clone())
    }

    pub fn bootstrapper(&self, authorizer: Arc<dyn Authorizer>) -> Arc<SessionBootstrapper> {
        let exchanger = SecondaryTokenExchanger::new(self.endpoint.clone(), SECONDARY_SCOPE);
        Arc::new(SessionBootstrapper::new(
            self.token_manager(),
            exchanger,
            authorizer,
            self.directory.clone(),
        ))
    }

    pub fn bootstrapper_with_grant(&self, grant: AuthorizationGrant) -> Arc<SessionBootstrapper> {
        self.bootstrapper(Arc::new(StaticAuthorizer::new(grant)))
    }

    /// Persist a session as if an earlier run had signed in.
    pub fn seed_tokens(&self, access_token: &str, refresh_token: Option<&str>, expires_at: DateTime<Utc>) {
        self.vault
            .save_record(&TokenRecord {
                access_token: access_token.to_string(),
                refresh_token: refresh_token.map(str::to_string),
                expires_at_utc: expires_at,
            })
            .unwrap();
    }

    pub fn network_calls(&self) -> usize {
        self.endpoint.calls().len() + self.directory.calls().len()
    }
}
