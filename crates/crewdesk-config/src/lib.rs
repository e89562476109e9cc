//! Configuration, filesystem paths, and logging setup for crewdesk.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{Config, StorageBackend, DEFAULT_AUTHORITY_URL, DEFAULT_LOG_LEVEL};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
