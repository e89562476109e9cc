//! Configuration management for the session runtime.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default application (client) ID registered with the identity provider.
/// Can be baked in at compile time via the CREWDESK_CLIENT_ID env var.
pub const DEFAULT_CLIENT_ID: &str = match option_env!("CREWDESK_CLIENT_ID") {
    Some(id) => id,
    None => "crewdesk-desktop",
};

/// Default identity provider authority.
pub const DEFAULT_AUTHORITY_URL: &str = "https://login.microsoftonline.com";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

const DEFAULT_TENANT_ID: &str = "common";
const DEFAULT_REDIRECT_URI: &str = "http://localhost:9876/callback";
const DEFAULT_PRIMARY_SCOPE: &str = "openid profile offline_access User.Read";
const DEFAULT_SECONDARY_SCOPE: &str = "api://crewdesk-content/.default";
const DEFAULT_PROFILE_URL: &str = "https://graph.microsoft.com/v1.0/me";
const DEFAULT_METADATA_URL: &str = "https://content.crewdesk.app/api/roles";
const DEFAULT_ROSTER_URL: &str = "https://content.crewdesk.app/api/roster";
const DEFAULT_REFRESH_THRESHOLD_SECS: u64 = 5 * 60;

/// Where persisted tokens live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// OS credential store (macOS Keychain, Linux Secret Service).
    Keychain,
    /// One file per key under the tokens directory.
    File,
    /// Process memory only; nothing survives a restart.
    Memory,
}

impl StorageBackend {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "keychain" => Some(Self::Keychain),
            "file" => Some(Self::File),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Main session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Directory tenant the user signs into.
    #[serde(default = "default_tenant_id")]
    pub tenant_id: String,
    /// Application (client) ID.
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Redirect URI registered for the application.
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    /// Identity provider authority base URL.
    #[serde(default = "default_authority_url")]
    pub authority_url: String,
    /// Scope requested for the primary (profile API) token.
    #[serde(default = "default_primary_scope")]
    pub primary_scope: String,
    /// Scope/audience of the secondary (content store) token.
    #[serde(default = "default_secondary_scope")]
    pub secondary_scope: String,
    /// Identity profile endpoint, called with the primary token.
    #[serde(default = "default_profile_url")]
    pub profile_url: String,
    /// Role metadata endpoint, called with the secondary token.
    #[serde(default = "default_metadata_url")]
    pub metadata_url: String,
    /// Task roster endpoint, called with the secondary token.
    #[serde(default = "default_roster_url")]
    pub roster_url: String,
    /// Seconds before expiry at which the primary token is renewed.
    #[serde(default = "default_refresh_threshold_secs")]
    pub refresh_threshold_secs: u64,
    /// Token persistence backend.
    #[serde(default = "default_storage_backend")]
    pub storage_backend: StorageBackend,
}

fn default_tenant_id() -> String {
    DEFAULT_TENANT_ID.to_string()
}

fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.to_string()
}

fn default_redirect_uri() -> String {
    DEFAULT_REDIRECT_URI.to_string()
}

fn default_authority_url() -> String {
    DEFAULT_AUTHORITY_URL.to_string()
}

fn default_primary_scope() -> String {
    DEFAULT_PRIMARY_SCOPE.to_string()
}

fn default_secondary_scope() -> String {
    DEFAULT_SECONDARY_SCOPE.to_string()
}

fn default_profile_url() -> String {
    DEFAULT_PROFILE_URL.to_string()
}

fn default_metadata_url() -> String {
    DEFAULT_METADATA_URL.to_string()
}

fn default_roster_url() -> String {
    DEFAULT_ROSTER_URL.to_string()
}

fn default_refresh_threshold_secs() -> u64 {
    DEFAULT_REFRESH_THRESHOLD_SECS
}

fn default_storage_backend() -> StorageBackend {
    StorageBackend::Keychain
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            tenant_id: default_tenant_id(),
            client_id: default_client_id(),
            redirect_uri: default_redirect_uri(),
            authority_url: default_authority_url(),
            primary_scope: default_primary_scope(),
            secondary_scope: default_secondary_scope(),
            profile_url: default_profile_url(),
            metadata_url: default_metadata_url(),
            roster_url: default_roster_url(),
            refresh_threshold_secs: DEFAULT_REFRESH_THRESHOLD_SECS,
            storage_backend: default_storage_backend(),
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file if present, falling back to
    /// defaults, then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the config file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply `CREWDESK_*` overrides from the given lookup.
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).and_then(non_empty);

        if let Some(level) = get("CREWDESK_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(tenant) = get("CREWDESK_TENANT_ID") {
            self.tenant_id = tenant;
        }
        if let Some(client_id) = get("CREWDESK_CLIENT_ID") {
            self.client_id = client_id;
        }
        if let Some(scope) = get("CREWDESK_SECONDARY_SCOPE") {
            self.secondary_scope = scope;
        }
        if let Some(url) = get("CREWDESK_METADATA_URL") {
            self.metadata_url = url;
        }
        if let Some(url) = get("CREWDESK_ROSTER_URL") {
            self.roster_url = url;
        }
        if let Some(raw) = get("CREWDESK_STORAGE_BACKEND") {
            match StorageBackend::parse(&raw) {
                Some(backend) => self.storage_backend = backend,
                None => tracing::warn!(value = %raw, "Ignoring unknown storage backend"),
            }
        }
    }

    /// Token endpoint: `{authority}/{tenant}/oauth2/v2.0/token`.
    pub fn token_endpoint(&self) -> CoreResult<Url> {
        let authority = self.authority_url.trim_end_matches('/');
        if self.tenant_id.trim().is_empty() {
            return Err(CoreError::Config("tenant_id must not be empty".to_string()));
        }
        let raw = format!("{}/{}/oauth2/v2.0/token", authority, self.tenant_id);
        Url::parse(&raw).map_err(CoreError::from)
    }

    /// Window before expiry at which the primary token counts as due for refresh.
    pub fn refresh_threshold(&self) -> Duration {
        Duration::from_secs(self.refresh_threshold_secs)
    }
}

fn non_empty(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.tenant_id, "common");
        assert_eq!(config.refresh_threshold_secs, 300);
        assert_eq!(config.storage_backend, StorageBackend::Keychain);
    }

    #[test]
    fn test_refresh_threshold_is_five_minutes_by_default() {
        assert_eq!(Config::default().refresh_threshold(), Duration::from_secs(300));
    }

    #[test]
    fn test_token_endpoint() {
        let mut config = Config::default();
        config.tenant_id = "contoso.onmicrosoft.com".to_string();
        config.authority_url = "https://login.microsoftonline.com/".to_string();

        let url = config.token_endpoint().unwrap();
        assert_eq!(
            url.as_str(),
            "https://login.microsoftonline.com/contoso.onmicrosoft.com/oauth2/v2.0/token"
        );
    }

    #[test]
    fn test_token_endpoint_rejects_empty_tenant() {
        let mut config = Config::default();
        config.tenant_id = "  ".to_string();
        assert!(matches!(config.token_endpoint(), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_token_endpoint_invalid_authority() {
        let mut config = Config::default();
        config.authority_url = "not a url".to_string();
        assert!(config.token_endpoint().is_err());
    }

    #[test]
    fn test_config_load_from_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");

        let config_json = r#"{
            "log_level": "debug",
            "tenant_id": "contoso",
            "storage_backend": "file"
        }"#;
        std::fs::write(&config_path, config_json).unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.tenant_id, "contoso");
        assert_eq!(config.storage_backend, StorageBackend::File);
        assert_eq!(config.profile_url, DEFAULT_PROFILE_URL);
        assert_eq!(config.refresh_threshold_secs, 300);
    }

    #[test]
    fn test_config_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let mut config = Config::default();
        config.client_id = "app-123".to_string();
        config.refresh_threshold_secs = 120;
        config.save(&paths).unwrap();

        let loaded = Config::load_from_file(&paths.config_file()).unwrap();
        assert_eq!(loaded.client_id, "app-123");
        assert_eq!(loaded.refresh_threshold_secs, 120);
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config::load(&paths).unwrap();
        assert_eq!(config.authority_url, DEFAULT_AUTHORITY_URL);
    }

    #[test]
    fn test_overrides_apply_and_ignore_blank_values() {
        let mut config = Config::default();
        config.apply_overrides(lookup_from(&[
            ("CREWDESK_TENANT_ID", "fabrikam"),
            ("CREWDESK_CLIENT_ID", "   "),
            ("CREWDESK_ROSTER_URL", "https://example.com/roster"),
            ("CREWDESK_STORAGE_BACKEND", "Memory"),
        ]));

        assert_eq!(config.tenant_id, "fabrikam");
        assert_eq!(config.client_id, DEFAULT_CLIENT_ID);
        assert_eq!(config.roster_url, "https://example.com/roster");
        assert_eq!(config.storage_backend, StorageBackend::Memory);
    }

    #[test]
    fn test_unknown_storage_backend_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides(lookup_from(&[("CREWDESK_STORAGE_BACKEND", "floppy")]));
        assert_eq!(config.storage_backend, StorageBackend::Keychain);
    }
}
