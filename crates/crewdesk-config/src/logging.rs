//! Logging initialization.
//!
//! Every binary calls [`init_logging`] once at startup and then uses the
//! standard `tracing` macros. Output goes to stderr; set
//! `CREWDESK_LOG_FORMAT=json` for JSON lines instead of the human format.
//! `RUST_LOG` takes precedence over the level passed in.

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Safe to call more than once; later calls are no-ops.
///
/// ```ignore
/// init_logging("info");
/// tracing::info!("Session runtime started");
/// ```
pub fn init_logging(level: &str) {
    let default_level = LevelFilter::from_level(parse_level(level));
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let result = if json_requested(std::env::var("CREWDESK_LOG_FORMAT").ok()) {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("Logging already initialized");
    }
}

fn json_requested(format: Option<String>) -> bool {
    format
        .map(|raw| raw.trim().eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
