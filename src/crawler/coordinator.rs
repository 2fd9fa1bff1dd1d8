//! Crawl coordinator - discovery of parallel documents
//!
//! Walks the frontier in order and probes every configured language on each
//! pending URL. Pages offering at least one language besides the main one are
//! appended to the registry. Every URL is marked visited once its probe
//! decision is made, whatever the outcome, so no URL is ever probed twice
//! across resumed runs.

use crate::config::Config;
use crate::crawler::context::RunContext;
use crate::crawler::retry::{RetryPolicy, RetryTarget};
use crate::driver::PageDriver;
use crate::state::{CrawlPhase, DocumentRecord, Frontier, Registry};
use crate::Result;

/// Settings for one crawl run
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub main_language: String,
    /// Languages probed on every URL, in probe order
    pub languages: Vec<String>,
    pub save_interval: usize,
    /// Registry size at which the crawl stops (0 = unbounded)
    pub max_documents: usize,
    pub retry: RetryPolicy,
}

impl CrawlOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            main_language: config.languages.main.clone(),
            languages: config.languages.targets.clone(),
            save_interval: config.crawler.save_interval.max(1),
            max_documents: config.crawler.max_documents,
            retry: RetryPolicy::new(config.crawler.probe_attempts),
        }
    }
}

/// Outcome of a crawl run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    pub phase: CrawlPhase,
    /// URLs probed during this run
    pub urls_processed: usize,
    /// Documents registered during this run
    pub documents_found: usize,
    /// URLs marked visited because the registry already held them
    pub urls_reconciled: usize,
    pub urls_visited: usize,
    pub urls_total: usize,
    pub documents_total: usize,
    /// True if the run stopped at the document cap rather than the frontier end
    pub cap_reached: bool,
    /// Seconds between the frontier's first start and its last save
    pub elapsed_secs: i64,
}

/// Main crawl coordinator
pub struct Crawler<'a, D: PageDriver> {
    ctx: &'a mut RunContext<D>,
    frontier: Frontier,
    registry: Registry,
    options: CrawlOptions,
    phase: CrawlPhase,
    resumed: bool,
}

impl<'a, D: PageDriver> Crawler<'a, D> {
    /// Creates a crawler over a freshly built frontier and registry
    pub fn new(
        ctx: &'a mut RunContext<D>,
        frontier: Frontier,
        registry: Registry,
        options: CrawlOptions,
    ) -> Self {
        Self {
            ctx,
            frontier,
            registry,
            options,
            phase: CrawlPhase::Init,
            resumed: false,
        }
    }

    /// Creates a crawler over state loaded from checkpoints
    ///
    /// The run reconciles the two checkpoints before probing.
    pub fn resume(
        ctx: &'a mut RunContext<D>,
        frontier: Frontier,
        registry: Registry,
        options: CrawlOptions,
    ) -> Self {
        Self {
            resumed: true,
            ..Self::new(ctx, frontier, registry, options)
        }
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Consumes the crawler, returning its state
    pub fn into_state(self) -> (Frontier, Registry) {
        (self.frontier, self.registry)
    }

    fn enter(&mut self, next: CrawlPhase) {
        if !self.phase.can_transition_to(next) {
            tracing::warn!("Unexpected crawl phase change {} -> {}", self.phase, next);
        }
        tracing::debug!("Crawl phase: {} -> {}", self.phase, next);
        self.phase = next;
    }

    fn cap_reached(&self) -> bool {
        self.options.max_documents > 0 && self.registry.len() >= self.options.max_documents
    }

    /// Runs the crawl to completion
    ///
    /// Per-URL driver failures never abort the run; only checkpoint failures
    /// propagate.
    pub async fn run(&mut self) -> Result<CrawlReport> {
        let mut urls_reconciled = 0;
        if self.resumed {
            self.enter(CrawlPhase::Resume);
            urls_reconciled = self.reconcile();
        }

        self.enter(CrawlPhase::Probing);
        let pending = self.frontier.pending_urls();
        tracing::info!(
            "Starting crawl: {} of {} URLs pending, {} documents registered",
            pending.len(),
            self.frontier.len(),
            self.registry.len()
        );

        let documents_before = self.registry.len();
        let mut urls_processed = 0;
        let mut cap_reached = false;

        for url in &pending {
            if self.cap_reached() {
                tracing::info!(
                    "Reached max number of documents to gather: {}. Stopping crawl.",
                    self.options.max_documents
                );
                cap_reached = true;
                break;
            }

            self.process_url(url).await;
            self.frontier.mark_visited(url);
            urls_processed += 1;

            if urls_processed % self.options.save_interval == 0 {
                tracing::info!(
                    "Progress: {} URLs probed, {} documents registered, {:?} elapsed",
                    urls_processed,
                    self.registry.len(),
                    self.ctx.elapsed()
                );
                self.checkpoint().await?;
            }
        }

        tracing::info!("Finishing crawl and saving.");
        self.checkpoint().await?;
        self.enter(CrawlPhase::Done);

        let report = CrawlReport {
            phase: self.phase,
            urls_processed,
            documents_found: self.registry.len() - documents_before,
            urls_reconciled,
            urls_visited: self.frontier.visited_count(),
            urls_total: self.frontier.len(),
            documents_total: self.registry.len(),
            cap_reached,
            elapsed_secs: self.frontier.timing().elapsed_secs(),
        };
        tracing::info!(
            "Crawl completed: {} URLs probed, {} new documents, {}s since first start",
            report.urls_processed,
            report.documents_found,
            report.elapsed_secs
        );
        Ok(report)
    }

    /// Marks every registered URL as visited
    ///
    /// The registry is saved before the frontier, so after an interruption it
    /// may hold documents whose URLs are still pending in the frontier.
    fn reconcile(&mut self) -> usize {
        let registered: Vec<String> = self.registry.iter().map(|r| r.url.clone()).collect();
        let mut reconciled = 0;
        for url in &registered {
            if self.frontier.mark_visited(url) {
                reconciled += 1;
            }
        }
        if reconciled > 0 {
            tracing::info!(
                "Marked {} registered URLs as visited in the frontier",
                reconciled
            );
        }
        reconciled
    }

    /// Probes one URL and registers it if it qualifies
    async fn process_url(&mut self, url: &str) {
        if self.registry.contains_url(url) {
            tracing::debug!("Already registered: {}", url);
            return;
        }

        let mut present = Vec::new();
        for lang in self.options.languages.clone() {
            if self.probe(url, &lang).await {
                present.push(lang);
            } else {
                tracing::debug!("'{}' not found in document {}", lang, url);
            }
        }

        if DocumentRecord::qualifies(&present, &self.options.main_language) {
            tracing::info!("Added parallel document at {} containing {:?}", url, present);
            let record = DocumentRecord::new(url, present, &self.options.main_language);
            self.registry.insert(record);
        } else {
            tracing::debug!("No parallel document at {} (found {:?})", url, present);
        }
    }

    /// Checks one language, retrying driver failures other than "not found"
    ///
    /// Every attempt navigates from `url` again; nothing is reloaded in between
    /// since the displayed page may belong to another document.
    async fn probe(&mut self, url: &str, lang: &str) -> bool {
        let policy = self.options.retry.clone();
        let mut attempt = 1;
        loop {
            match self.ctx.driver_mut().probe_language(url, lang).await {
                Ok(()) => return true,
                Err(e) if e.is_not_found() => return false,
                Err(e) => {
                    tracing::warn!(
                        "Probe of '{}' at {} failed (attempt {}/{}): {}",
                        lang,
                        url,
                        attempt,
                        policy.max_attempts(),
                        e
                    );
                    if !policy.allows_retry(attempt) {
                        policy.exhausted(RetryTarget::Probe { url }, lang);
                        return false;
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Saves the registry, then the frontier, then clears the driver session
    async fn checkpoint(&mut self) -> Result<()> {
        let workspace = self.ctx.workspace().clone();
        self.registry.save(&workspace.registry_path())?;
        self.frontier.save(&workspace.frontier_path())?;
        self.ctx.clear_session().await;
        Ok(())
    }
}
