//! Kin-Harvest: a Q&A listing harvester
//!
//! This crate fetches one search listing from a Q&A site, drops entries that
//! are already stored, fetches the remaining detail pages concurrently and
//! upserts the merged records into a persistence sink.

pub mod config;
pub mod harvester;
pub mod record;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Kin-Harvest operations
///
/// Only configuration and sink-setup failures surface as a `HarvestError`
/// from a run. Per-item failures are reported through the run summary.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },
}

/// Result type alias for Kin-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use harvester::{run_once, Coordinator};
pub use record::{CandidateReference, DetailRecord};
pub use state::{ItemOutcome, RunStage, RunSummary};
pub use storage::{MemorySink, PersistenceSink, SqliteSink};
