//! Storage key constants.

/// Storage keys for the persisted primary token.
pub struct StorageKeys;

impl StorageKeys {
    /// Primary access token
    pub const ACCESS_TOKEN: &'static str = "primary_access_token";

    /// Primary refresh token
    pub const REFRESH_TOKEN: &'static str = "primary_refresh_token";

    /// Absolute expiry of the access token (RFC 3339, UTC)
    pub const EXPIRES_AT: &'static str = "primary_expires_at";

    /// Every key owned by the token vault.
    pub const ALL: [&'static str; 3] = [Self::ACCESS_TOKEN, Self::REFRESH_TOKEN, Self::EXPIRES_AT];
}
