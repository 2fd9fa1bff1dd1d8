//! HTTP sitemap loader
//!
//! Fetches the root sitemap and, for sitemap indexes, every child sitemap
//! breadth-first up to a fixed number of documents.

use crate::config::Config;
use crate::sitemap::parser::{parse_sitemap, SitemapDocument};
use crate::sitemap::{apply_exclusions, resolve_sitemap_url, SitemapSource};
use crate::{HarvestError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;

/// Default limit on sitemap documents fetched per load
pub const DEFAULT_MAX_SITEMAPS: usize = 50;

/// Sitemap loader backed by reqwest
pub struct HttpSitemapLoader {
    client: Client,
    max_sitemaps: usize,
}

impl HttpSitemapLoader {
    /// Creates a loader with the given user agent and request timeout
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            max_sitemaps: DEFAULT_MAX_SITEMAPS,
        })
    }

    /// Creates a loader from the driver section of a config
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.driver.user_agent,
            Duration::from_secs(config.driver.timeout_secs),
        )
    }

    /// Overrides the limit on sitemap documents fetched per load
    pub fn with_max_sitemaps(mut self, max_sitemaps: usize) -> Self {
        self.max_sitemaps = max_sitemaps.max(1);
        self
    }

    async fn fetch_document(&self, url: &str) -> Result<SitemapDocument> {
        let unavailable = |message: String| HarvestError::SourceUnavailable {
            url: url.to_string(),
            message,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(format!("HTTP {}", status)));
        }

        let content = response
            .text()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        parse_sitemap(&content).ok_or_else(|| unavailable("not a sitemap document".to_string()))
    }
}

#[async_trait]
impl SitemapSource for HttpSitemapLoader {
    async fn fetch_urls(&self, origin: &str, exclude: &[String]) -> Result<Vec<String>> {
        let root = resolve_sitemap_url(origin)?;
        tracing::info!("Loading sitemap: {}", root);

        let mut urls = Vec::new();
        let mut queue = VecDeque::from([root.clone()]);
        let mut seen = HashSet::from([root.clone()]);
        let mut fetched = 0;

        while let Some(sitemap_url) = queue.pop_front() {
            if fetched >= self.max_sitemaps {
                tracing::warn!(
                    "Reached sitemap limit ({}), {} child sitemaps not fetched",
                    self.max_sitemaps,
                    queue.len() + 1
                );
                break;
            }
            fetched += 1;

            let document = match self.fetch_document(&sitemap_url).await {
                Ok(document) => document,
                // The root sitemap is the whole frontier; without it there is nothing to do
                Err(e) if sitemap_url == root => return Err(e),
                Err(e) => {
                    tracing::warn!("Skipping child sitemap: {}", e);
                    continue;
                }
            };

            match document {
                SitemapDocument::UrlSet(entries) => {
                    tracing::debug!("Found {} URLs in {}", entries.len(), sitemap_url);
                    urls.extend(entries);
                }
                SitemapDocument::Index(children) => {
                    tracing::debug!("Found {} child sitemaps in {}", children.len(), sitemap_url);
                    for child in children {
                        if seen.insert(child.clone()) {
                            queue.push_back(child);
                        }
                    }
                }
            }
        }

        let urls = apply_exclusions(urls, exclude);
        tracing::info!("Collected {} URLs from {} sitemaps", urls.len(), fetched);
        Ok(urls)
    }
}
