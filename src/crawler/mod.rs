//! Crawler module - the two resumable harvest phases
//!
//! This module contains:
//! - The crawl coordinator, which finds parallel documents
//! - The scrape coordinator, which extracts their text
//! - The run context and retry policy both of them share
//!
//! Each phase works against one page driver session and checkpoints its
//! progress to the working directory at a fixed interval.

mod context;
mod coordinator;
mod retry;
mod scrape;

pub use context::RunContext;
pub use coordinator::{CrawlOptions, CrawlReport, Crawler};
pub use retry::{ExhaustionHook, LogExhaustion, RetryPolicy, RetryTarget};
pub use scrape::{RejectedDocument, ScrapeOptions, ScrapeReport, Scraper};

use crate::config::Config;
use crate::driver::PageDriver;
use crate::sitemap::{load_frontier, SitemapSource};
use crate::state::{Frontier, Registry};
use crate::storage::if_present;
use crate::Result;

/// How a crawl treats checkpoints already in the working directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResumeMode {
    /// Resume from checkpoints; fail if the frontier checkpoint is missing
    Required,
    /// Resume if checkpoints exist, otherwise start from the sitemap
    #[default]
    IfPresent,
    /// Ignore existing checkpoints and start from the sitemap
    Fresh,
}

/// Runs a complete crawl
///
/// Builds or loads the frontier and registry according to `mode`, then probes
/// every pending URL.
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl finished (frontier exhausted or cap reached)
/// * `Err(HarvestError::CheckpointMissing)` - `Required` mode without a frontier
/// * `Err(HarvestError::SourceUnavailable)` - The sitemap could not be loaded
pub async fn run_crawl<D, S>(
    ctx: &mut RunContext<D>,
    source: &S,
    config: &Config,
    mode: ResumeMode,
) -> Result<CrawlReport>
where
    D: PageDriver,
    S: SitemapSource + ?Sized,
{
    let workspace = ctx.workspace().clone();
    let options = CrawlOptions::from_config(config);

    let (frontier, registry) = match mode {
        ResumeMode::Fresh => (None, None),
        ResumeMode::Required => (
            Some(Frontier::load(&workspace.frontier_path())?),
            if_present(Registry::load(&workspace.registry_path()))?,
        ),
        ResumeMode::IfPresent => (
            if_present(Frontier::load(&workspace.frontier_path()))?,
            if_present(Registry::load(&workspace.registry_path()))?,
        ),
    };

    let resumed = frontier.is_some() || registry.is_some();
    let frontier = match frontier {
        Some(frontier) => frontier,
        None => load_frontier(source, &config.site.sitemap_url, &config.site.exclude).await?,
    };
    let registry = registry.unwrap_or_default();

    let mut crawler = if resumed {
        tracing::info!(
            "Resuming crawl: {} visited URLs, {} registered documents",
            frontier.visited_count(),
            registry.len()
        );
        Crawler::resume(ctx, frontier, registry, options)
    } else {
        Crawler::new(ctx, frontier, registry, options)
    };
    crawler.run().await
}

/// Runs a complete scrape over the registry in the working directory
///
/// # Returns
///
/// * `Ok(ScrapeReport)` - Every pending document was attempted
/// * `Err(HarvestError::CheckpointMissing)` - No registry to scrape
pub async fn run_scrape<D: PageDriver>(
    ctx: &mut RunContext<D>,
    config: &Config,
    rescrape: bool,
) -> Result<ScrapeReport> {
    let registry = Registry::load(&ctx.workspace().registry_path())?;
    let options = ScrapeOptions::from_config(config, rescrape);
    Scraper::new(ctx, registry, options).run().await
}
