//! Profile, role metadata and roster fetches.

use crate::model::{ProviderProfile, RoleMetadata, RosterEntry};
use crate::{SessionError, SessionResult};
use async_trait::async_trait;
use crewdesk_config::Config;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

/// Remote reads that make up a session.
///
/// The profile is read with the primary token; metadata and roster with the
/// secondary token.
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    async fn fetch_profile(&self, primary_token: &str) -> SessionResult<ProviderProfile>;

    async fn fetch_metadata(&self, secondary_token: &str) -> SessionResult<Vec<RoleMetadata>>;

    async fn fetch_roster(&self, secondary_token: &str) -> SessionResult<Vec<RosterEntry>>;
}

/// List endpoints return either a bare array or a `{"value": [...]}` page.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody<T> {
    Bare(Vec<T>),
    Enveloped { value: Vec<T> },
}

impl<T> ListBody<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            ListBody::Bare(items) => items,
            ListBody::Enveloped { value } => value,
        }
    }
}

/// `DirectoryApi` over HTTP with bearer authentication.
#[derive(Clone)]
pub struct HttpDirectoryClient {
    http: reqwest::Client,
    profile_url: Url,
    metadata_url: Url,
    roster_url: Url,
}

impl HttpDirectoryClient {
    pub fn new(profile_url: Url, metadata_url: Url, roster_url: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            profile_url,
            metadata_url,
            roster_url,
        }
    }

    pub fn from_config(config: &Config) -> SessionResult<Self> {
        Ok(Self::new(
            Url::parse(&config.profile_url)?,
            Url::parse(&config.metadata_url)?,
            Url::parse(&config.roster_url)?,
        ))
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        token: &str,
        operation: &'static str,
    ) -> SessionResult<T> {
        debug!(url = %url, operation, "Fetching");

        let response = self
            .http
            .get(url.clone())
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, operation, body_len = body.len(), "Fetch rejected");
            return Err(SessionError::EndpointRejected {
                operation,
                status: status.as_u16(),
                detail: format!("len={}", body.len()),
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl DirectoryApi for HttpDirectoryClient {
    async fn fetch_profile(&self, primary_token: &str) -> SessionResult<ProviderProfile> {
        self.get_json(&self.profile_url, primary_token, "profile fetch")
            .await
    }

    async fn fetch_metadata(&self, secondary_token: &str) -> SessionResult<Vec<RoleMetadata>> {
        let body: ListBody<RoleMetadata> = self
            .get_json(&self.metadata_url, secondary_token, "metadata fetch")
            .await?;
        Ok(body.into_vec())
    }

    async fn fetch_roster(&self, secondary_token: &str) -> SessionResult<Vec<RosterEntry>> {
        let body: ListBody<RosterEntry> = self
            .get_json(&self.roster_url, secondary_token, "roster fetch")
            .await?;
        Ok(body.into_vec())
    }
}
