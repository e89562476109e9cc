//! Wiring shared by every command.

use std::sync::Arc;

use async_trait::async_trait;
use crewdesk_config::{Config, Paths};
use crewdesk_session::{
    AuthorizationGrant, Authorizer, SessionBootstrapper, SessionError, SessionResult,
    SystemClock,
};
use crewdesk_storage::{create_token_vault, TokenVault};
use tracing::debug;

/// Authorizer for commands that must never start an interactive sign-in.
struct NonInteractive;

#[async_trait]
impl Authorizer for NonInteractive {
    async fn authorize(&self) -> SessionResult<AuthorizationGrant> {
        Err(SessionError::Authorization(
            "interactive sign-in is not available here, use `crewdesk login`".to_string(),
        ))
    }
}

pub struct SessionContext {
    config: Config,
    vault: Arc<TokenVault>,
}

impl SessionContext {
    pub fn open(config: Config, paths: Paths) -> anyhow::Result<Self> {
        paths.ensure_dirs()?;
        let vault = Arc::new(create_token_vault(&config, &paths)?);
        debug!(backend = ?config.storage_backend, base_dir = %paths.base_dir().display(), "Session context ready");
        Ok(Self { config, vault })
    }

    /// Bootstrapper that cannot sign in interactively.
    pub fn bootstrapper(&self) -> anyhow::Result<SessionBootstrapper> {
        self.bootstrapper_with(Arc::new(NonInteractive))
    }

    pub fn bootstrapper_with(
        &self,
        authorizer: Arc<dyn Authorizer>,
    ) -> anyhow::Result<SessionBootstrapper> {
        Ok(SessionBootstrapper::from_config(
            &self.config,
            self.vault.clone(),
            authorizer,
            Arc::new(SystemClock),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crewdesk_config::StorageBackend;
    use crewdesk_session::SessionPhase;
    use tempfile::TempDir;

    fn memory_context() -> (TempDir, SessionContext) {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage_backend = StorageBackend::Memory;
        let ctx = SessionContext::open(config, Paths::with_base_dir(dir.path().to_path_buf()))
            .unwrap();
        (dir, ctx)
    }

    #[test]
    fn test_open_creates_directories() {
        let (dir, _ctx) = memory_context();
        assert!(dir.path().join("tokens").is_dir());
    }

    #[tokio::test]
    async fn test_status_without_tokens_is_signed_out() {
        let (_dir, ctx) = memory_context();
        let session = ctx.bootstrapper().unwrap();

        session.check_auth_status().await.unwrap();

        assert_eq!(session.phase(), SessionPhase::SignedOut);
    }

    #[tokio::test]
    async fn test_default_bootstrapper_refuses_interactive_login() {
        let (_dir, ctx) = memory_context();
        let session = ctx.bootstrapper().unwrap();

        let err = session.login().await.unwrap_err();

        assert!(matches!(err, SessionError::Authorization(_)));
    }
}
