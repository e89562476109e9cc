//! Crewdesk session CLI - sign in, inspect and tear down the local session.

mod commands;
mod context;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use crewdesk_config::{init_logging, Config, Paths};

use crate::context::SessionContext;

/// Crewdesk session command-line interface.
#[derive(Parser)]
#[command(name = "crewdesk")]
#[command(about = "Manage the Crewdesk sign-in session")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for config, tokens and logs. Defaults to ~/.crewdesk
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Restore the persisted session and print it
    Status,
    /// Sign in with tokens obtained from the identity provider
    Login {
        /// Primary access token
        #[arg(long, env = "CREWDESK_ACCESS_TOKEN", hide_env_values = true)]
        access_token: String,

        /// Refresh token; without it no secondary token can be derived
        #[arg(long, env = "CREWDESK_REFRESH_TOKEN", hide_env_values = true)]
        refresh_token: Option<String>,

        /// Absolute access token expiry (RFC 3339)
        #[arg(long, conflicts_with = "expires_in")]
        expires_at: Option<DateTime<Utc>>,

        /// Access token lifetime in seconds from now
        #[arg(long)]
        expires_in: Option<i64>,
    },
    /// Sign out and delete persisted tokens
    Logout,
    /// Refetch the task roster for the current session
    RefreshRoster,
    /// Print a valid primary access token, refreshing it if due
    Token,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let config = Config::load(&paths)?;

    // Initialize logging
    init_logging(cli.log_level.as_deref().unwrap_or(&config.log_level));

    let ctx = SessionContext::open(config, paths)?;

    match cli.command {
        Commands::Status => commands::status::run(&ctx).await,
        Commands::Login {
            access_token,
            refresh_token,
            expires_at,
            expires_in,
        } => {
            let expires_at = commands::login::resolve_expiry(expires_at, expires_in, Utc::now())?;
            commands::login::run(&ctx, access_token, refresh_token, expires_at).await
        }
        Commands::Logout => commands::logout::run(&ctx),
        Commands::RefreshRoster => commands::roster::run(&ctx).await,
        Commands::Token => commands::token::run(&ctx).await,
    }
}
