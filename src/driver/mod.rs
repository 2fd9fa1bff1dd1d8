//! Page driver abstraction
//!
//! A page driver is a single stateful rendering session: it shows one page in
//! one language at a time. Crawl and scrape talk to it strictly sequentially and
//! rely on knowing what is currently displayed, so a driver must never be
//! shared between concurrent workers.
//!
//! # Implementations
//!
//! - `HttpPageDriver`: fetches pages over HTTP and follows `hreflang`
//!   alternates to switch language
//! - `ScriptedDriver`: in-memory site with a call log, used by tests

mod http;
mod scripted;

pub use http::HttpPageDriver;
pub use scripted::{DriverCall, ScriptedDriver};

use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by a page driver
#[derive(Debug, Error)]
pub enum DriverError {
    /// The page does not offer the requested language
    #[error("language '{lang}' not available at {url}")]
    LanguageNotFound { url: String, lang: String },

    /// The page could not be loaded
    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    /// An operation needed a current page but none is displayed
    #[error("no page is currently displayed")]
    NoPage,

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl DriverError {
    /// True if the error means the language variant does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::LanguageNotFound { .. })
    }
}

/// Text segments of the currently displayed page
///
/// Both groups are kept in document order; entries are trimmed and empty ones
/// dropped on construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextSegments {
    pub primary: Vec<String>,
    pub secondary: Vec<String>,
}

impl TextSegments {
    pub fn new(primary: Vec<String>, secondary: Vec<String>) -> Self {
        Self {
            primary: clean(primary),
            secondary: clean(secondary),
        }
    }

    /// Total number of segments across both groups
    pub fn len(&self) -> usize {
        self.primary.len() + self.secondary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.secondary.is_empty()
    }
}

fn clean(segments: Vec<String>) -> Vec<String> {
    segments
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// A single rendering session the orchestrators drive
///
/// Every method may block for an unbounded but finite time (page loads,
/// language switches). Callers bound retries themselves.
#[async_trait]
pub trait PageDriver: Send {
    /// Displays `url` in `lang`
    ///
    /// Fails with [`DriverError::LanguageNotFound`] if the page has no such
    /// variant.
    async fn render_language(&mut self, url: &str, lang: &str) -> Result<(), DriverError>;

    /// Checks whether `url` offers `lang`
    ///
    /// The default implementation renders the variant.
    async fn probe_language(&mut self, url: &str, lang: &str) -> Result<(), DriverError> {
        self.render_language(url, lang).await
    }

    /// Text segments of the page currently displayed
    async fn current_text_segments(&mut self) -> Result<TextSegments, DriverError>;

    /// Reloads the page currently displayed
    async fn reload(&mut self) -> Result<(), DriverError>;

    /// Drops cookies and any other session state
    async fn clear_session(&mut self) -> Result<(), DriverError>;
}
