//! Identity provider token endpoint.

use crate::{SessionError, SessionResult};
use async_trait::async_trait;
use crewdesk_config::Config;
use serde::{Deserialize, Deserializer};
use std::fmt;
use tracing::{debug, warn};
use url::Url;

/// Successful response from the token endpoint.
#[derive(Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    /// Absent when the provider keeps the caller's refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds, relative to when the request was made.
    #[serde(deserialize_with = "seconds")]
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Some providers send `expires_in` as a string.
fn seconds<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Number(i64),
        Text(String),
    }

    match Seconds::deserialize(deserializer)? {
        Seconds::Number(n) => Ok(n),
        Seconds::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Redeems a refresh token for an access token with the given scope.
///
/// Used for both the primary refresh and the secondary exchange; only the
/// scope differs.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    async fn redeem_refresh_token(
        &self,
        refresh_token: &str,
        scope: &str,
    ) -> SessionResult<TokenGrant>;
}

/// Error body shape of OAuth2 token endpoints.
#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
}

/// HTTP client for the identity provider's token endpoint.
#[derive(Clone)]
pub struct IdentityProviderClient {
    http: reqwest::Client,
    token_url: Url,
    client_id: String,
    redirect_uri: String,
}

impl IdentityProviderClient {
    pub fn new(
        token_url: Url,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            token_url,
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
        }
    }

    /// Build a client for the configured tenant's token endpoint.
    pub fn from_config(config: &Config) -> SessionResult<Self> {
        Ok(Self::new(
            config.token_endpoint()?,
            config.client_id.clone(),
            config.redirect_uri.clone(),
        ))
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    pub fn token_url(&self) -> &Url {
        &self.token_url
    }
}

#[async_trait]
impl TokenEndpoint for IdentityProviderClient {
    async fn redeem_refresh_token(
        &self,
        refresh_token: &str,
        scope: &str,
    ) -> SessionResult<TokenGrant> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("scope", scope),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        debug!(url = %self.token_url, scope = %scope, "Redeeming refresh token");

        let response = self
            .http
            .post(self.token_url.clone())
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = summarize_error_body(&body);
            warn!(status = %status, detail = %detail, scope = %scope, "Token endpoint rejected grant");
            return Err(SessionError::EndpointRejected {
                operation: "token grant",
                status: status.as_u16(),
                detail,
            });
        }

        let grant: TokenGrant = response.json().await?;
        Ok(grant)
    }
}

/// OAuth error code if the body carries one, otherwise just its length.
/// Token endpoint bodies can echo request data, so raw text is never kept.
fn summarize_error_body(body: &str) -> String {
    match serde_json::from_str::<OAuthErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) => format!("len={}", body.len()),
    }
}
