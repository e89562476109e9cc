//! Secure token storage for crewdesk.
//!
//! Backends:
//! - **macOS**: Keychain via `security-framework`
//! - **Linux**: Secret Service (GNOME Keyring / KWallet) via `secret-service`
//! - **File**: one file per key, atomically replaced on write
//! - **Memory**: process-local, nothing persists
//!
//! [`TokenVault`] layers the primary token record (access token, refresh
//! token, absolute expiry) on top of whichever backend is selected.

mod file;
mod keys;
mod memory;
mod traits;
mod vault;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "linux")]
mod linux;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use traits::SecureStorage;
pub use vault::{TokenRecord, TokenVault};

use crewdesk_config::{Config, Paths, StorageBackend};
use thiserror::Error;

/// Service name used for all OS credential store entries.
pub const SERVICE_NAME: &str = "app.crewdesk.session";

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Platform-specific storage error
    #[error("Platform storage error: {0}")]
    Platform(String),

    /// Key not found
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Create the storage backend selected by `config.storage_backend`.
///
/// `keychain` falls back to [`FileStorage`] when no OS credential store is
/// reachable on this machine.
pub fn create_storage(config: &Config, paths: &Paths) -> StorageResult<Box<dyn SecureStorage>> {
    match config.storage_backend {
        StorageBackend::Memory => Ok(Box::new(MemoryStorage::new())),
        StorageBackend::File => Ok(Box::new(FileStorage::new(paths.tokens_dir()))),
        StorageBackend::Keychain => create_keychain_storage(paths),
    }
}

/// Create a [`TokenVault`] over the configured backend.
pub fn create_token_vault(config: &Config, paths: &Paths) -> StorageResult<TokenVault> {
    let storage = create_storage(config, paths)?;
    Ok(TokenVault::new(storage))
}

#[cfg(target_os = "macos")]
fn create_keychain_storage(_paths: &Paths) -> StorageResult<Box<dyn SecureStorage>> {
    Ok(Box::new(macos::KeychainStorage::new(SERVICE_NAME)))
}

#[cfg(target_os = "linux")]
fn create_keychain_storage(paths: &Paths) -> StorageResult<Box<dyn SecureStorage>> {
    match linux::SecretServiceStorage::new(SERVICE_NAME) {
        Ok(storage) => Ok(Box::new(storage)),
        Err(e) => {
            tracing::warn!(error = %e, "Secret Service unavailable, using file storage");
            Ok(Box::new(FileStorage::new(paths.tokens_dir())))
        }
    }
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
fn create_keychain_storage(paths: &Paths) -> StorageResult<Box<dyn SecureStorage>> {
    tracing::warn!("No OS credential store backend for this platform, using file storage");
    Ok(Box::new(FileStorage::new(paths.tokens_dir())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_create_memory_storage() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        let mut config = Config::default();
        config.storage_backend = StorageBackend::Memory;

        let storage = create_storage(&config, &paths).unwrap();
        storage.set(StorageKeys::ACCESS_TOKEN, "at").unwrap();
        assert_eq!(
            storage.get(StorageKeys::ACCESS_TOKEN).unwrap(),
            Some("at".to_string())
        );
        assert!(!paths.tokens_dir().exists());
    }

    #[test]
    fn test_create_file_storage_persists_across_instances() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        let mut config = Config::default();
        config.storage_backend = StorageBackend::File;

        let vault = create_token_vault(&config, &paths).unwrap();
        vault.set_refresh_token("rt1").unwrap();
        drop(vault);

        let reopened = create_token_vault(&config, &paths).unwrap();
        assert_eq!(reopened.refresh_token().unwrap(), Some("rt1".to_string()));
    }
}
