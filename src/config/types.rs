use serde::Deserialize;

/// Main configuration structure for Parallel-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    pub languages: LanguageConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub driver: DriverConfig,
    pub output: OutputConfig,
}

/// Where the candidate URLs come from
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Sitemap URL, or a site origin whose `/sitemap.xml` is used
    #[serde(rename = "sitemap-url")]
    pub sitemap_url: String,

    /// URLs containing any of these substrings are dropped from the frontier
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Language selection
#[derive(Debug, Clone, Deserialize)]
pub struct LanguageConfig {
    /// The site's source language, paired with every other language on export
    pub main: String,

    /// Languages probed on every page
    pub targets: Vec<String>,

    /// Languages to export; empty means every column found in the tables
    #[serde(default)]
    pub export: Vec<String>,
}

/// Crawl (discovery) behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Checkpoint every N probed URLs
    #[serde(rename = "save-interval", default = "default_save_interval")]
    pub save_interval: usize,

    /// Stop once this many parallel documents are registered (0 = unbounded)
    #[serde(rename = "max-documents", default)]
    pub max_documents: usize,

    /// Attempts per language probe when the driver fails for reasons other
    /// than the language being absent
    #[serde(rename = "probe-attempts", default = "default_probe_attempts")]
    pub probe_attempts: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            save_interval: default_save_interval(),
            max_documents: 0,
            probe_attempts: default_probe_attempts(),
        }
    }
}

/// Scrape (extraction) behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    /// Checkpoint every N scraped documents
    #[serde(rename = "save-interval", default = "default_save_interval")]
    pub save_interval: usize,

    /// Render attempts per language before giving up on it
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            save_interval: default_save_interval(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Settings for the HTTP page driver
#[derive(Debug, Clone, Deserialize)]
pub struct DriverConfig {
    /// User agent sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// CSS selector for the primary paragraph group
    #[serde(rename = "primary-selector", default = "default_primary_selector")]
    pub primary_selector: String,

    /// CSS selector for the secondary paragraph group
    #[serde(rename = "secondary-selector", default = "default_secondary_selector")]
    pub secondary_selector: String,

    /// Request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Pause after every navigation (milliseconds)
    #[serde(rename = "settle-delay-ms", default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            primary_selector: default_primary_selector(),
            secondary_selector: default_secondary_selector(),
            timeout_secs: default_timeout_secs(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory holding checkpoints, tables and the exported corpus
    #[serde(rename = "working-dir")]
    pub working_dir: String,

    /// Optional markdown coverage report written after export
    #[serde(rename = "summary-path", default)]
    pub summary_path: Option<String>,
}

fn default_save_interval() -> usize {
    50
}

fn default_probe_attempts() -> u32 {
    2
}

fn default_max_attempts() -> u32 {
    3
}

fn default_user_agent() -> String {
    format!("parallel-harvest/{}", env!("CARGO_PKG_VERSION"))
}

fn default_primary_selector() -> String {
    "p[id^='p']".to_string()
}

fn default_secondary_selector() -> String {
    "figcaption, .boxContent p".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_settle_delay_ms() -> u64 {
    1000
}
