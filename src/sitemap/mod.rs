//! Sitemap loading
//!
//! Turns a site's sitemap into the initial frontier. Loading has no side
//! effects: nothing is written until the crawl saves its first checkpoint.

mod http;
mod parser;

pub use http::{HttpSitemapLoader, DEFAULT_MAX_SITEMAPS};
pub use parser::{decode_entities, parse_sitemap, SitemapDocument};

use crate::state::Frontier;
use crate::{HarvestError, Result};
use async_trait::async_trait;
use url::Url;

/// A source of candidate page URLs
#[async_trait]
pub trait SitemapSource: Send + Sync {
    /// Returns every page URL listed for `origin`, minus excluded ones
    ///
    /// Fails with `HarvestError::SourceUnavailable` if the listing cannot be
    /// fetched or parsed.
    async fn fetch_urls(&self, origin: &str, exclude: &[String]) -> Result<Vec<String>>;
}

/// Drops every URL containing one of the exclusion tokens
pub fn apply_exclusions(urls: Vec<String>, exclude: &[String]) -> Vec<String> {
    if exclude.is_empty() {
        return urls;
    }

    let before = urls.len();
    let kept: Vec<String> = urls
        .into_iter()
        .filter(|url| !exclude.iter().any(|token| url.contains(token.as_str())))
        .collect();

    tracing::debug!("Excluded {} of {} URLs", before - kept.len(), before);
    kept
}

/// Resolves the sitemap location for a configured origin
///
/// A URL whose path already names an XML document is used as-is; anything
/// else is treated as a site origin and `sitemap.xml` is resolved against it.
pub fn resolve_sitemap_url(origin: &str) -> Result<String> {
    let mut url = Url::parse(origin).map_err(|e| HarvestError::SourceUnavailable {
        url: origin.to_string(),
        message: e.to_string(),
    })?;

    if url.path().ends_with(".xml") || url.path().ends_with(".xml.gz") {
        return Ok(url.to_string());
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);

    url.join("sitemap.xml")
        .map(|u| u.to_string())
        .map_err(|e| HarvestError::SourceUnavailable {
            url: origin.to_string(),
            message: e.to_string(),
        })
}

/// Builds a fresh frontier from a sitemap source
///
/// Every URL starts unvisited; duplicates collapse onto their first
/// occurrence.
pub async fn load_frontier<S>(source: &S, origin: &str, exclude: &[String]) -> Result<Frontier>
where
    S: SitemapSource + ?Sized,
{
    let urls = source.fetch_urls(origin, exclude).await?;
    let frontier = Frontier::from_urls(urls);
    tracing::info!("Collected {} URLs from site map", frontier.len());
    Ok(frontier)
}
