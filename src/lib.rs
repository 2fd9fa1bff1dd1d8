//! Parallel-Harvest: a resumable parallel-corpus harvester
//!
//! This crate discovers documents on a multilingual website, works out which of
//! them exist in several target languages, extracts paragraph-aligned text from
//! every language variant and exports a line-aligned corpus per language pair.
//!
//! Crawl and scrape runs are checkpointed so that a job interrupted after hours
//! of work picks up where it stopped. Only one run may own a working directory
//! at a time: there is no file locking, and two processes writing the same
//! checkpoints will overwrite each other's progress.

pub mod config;
pub mod crawler;
pub mod document;
pub mod driver;
pub mod output;
pub mod sitemap;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Parallel-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Sitemap unavailable at {url}: {message}")]
    SourceUnavailable { url: String, message: String },

    #[error("Checkpoint not found: {}", path.display())]
    CheckpointMissing { path: std::path::PathBuf },

    #[error("Malformed checkpoint {}: {message}", path.display())]
    Checkpoint {
        path: std::path::PathBuf,
        message: String,
    },

    #[error("Language '{lang}' not found at {url}")]
    LanguageNotFound { url: String, lang: String },

    #[error("Extraction for document {id} is invalid: {reason}")]
    ExtractionInvalid { id: String, reason: String },

    #[error("Alignment mismatch in {table} ({main}-{other}): {reason}")]
    AlignmentMismatch {
        table: String,
        main: String,
        other: String,
        reason: String,
    },

    #[error("Page driver error: {0}")]
    Driver(driver::DriverError),

    #[error("Table error: {0}")]
    Table(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<driver::DriverError> for HarvestError {
    fn from(err: driver::DriverError) -> Self {
        match err {
            driver::DriverError::LanguageNotFound { url, lang } => {
                HarvestError::LanguageNotFound { url, lang }
            }
            other => HarvestError::Driver(other),
        }
    }
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

    #[error("Invalid language code: {0}")]
    InvalidLanguage(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),
}

/// Result type alias for Parallel-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use document::{validate, ExtractedTable, Validation};
pub use driver::{PageDriver, TextSegments};
pub use state::{CrawlPhase, DocumentRecord, Frontier, Registry};
