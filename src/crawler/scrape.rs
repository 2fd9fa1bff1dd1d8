//! Scrape coordinator - text extraction for registered documents
//!
//! For every unscraped document, renders each declared language, reads the
//! paragraph segments, assembles a table keyed by row label and validates it.
//! Only validated tables are written and only then is the document flagged
//! as scraped.

use crate::config::Config;
use crate::crawler::context::RunContext;
use crate::crawler::retry::{RetryPolicy, RetryTarget};
use crate::document::{validate, ExtractedTable, LanguageColumn};
use crate::driver::{PageDriver, TextSegments};
use crate::state::{DocumentRecord, Registry};
use crate::{HarvestError, Result};

/// Settings for one scrape run
#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    pub save_interval: usize,
    pub retry: RetryPolicy,
    /// Clear every scraped flag first and extract all documents again
    pub rescrape: bool,
}

impl ScrapeOptions {
    pub fn from_config(config: &Config, rescrape: bool) -> Self {
        Self {
            save_interval: config.scraper.save_interval.max(1),
            retry: RetryPolicy::new(config.scraper.max_attempts),
            rescrape,
        }
    }
}

/// A document whose extraction did not validate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedDocument {
    pub id: String,
    pub url: String,
    pub reason: String,
}

/// Outcome of a scrape run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeReport {
    /// Documents attempted during this run
    pub attempted: usize,
    /// Documents whose tables were written
    pub scraped: usize,
    pub rejected: Vec<RejectedDocument>,
    /// Unscraped documents left in the registry
    pub pending: usize,
}

/// Main scrape coordinator
pub struct Scraper<'a, D: PageDriver> {
    ctx: &'a mut RunContext<D>,
    registry: Registry,
    options: ScrapeOptions,
}

impl<'a, D: PageDriver> Scraper<'a, D> {
    pub fn new(ctx: &'a mut RunContext<D>, registry: Registry, options: ScrapeOptions) -> Self {
        Self {
            ctx,
            registry,
            options,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn into_registry(self) -> Registry {
        self.registry
    }

    /// Runs the scrape over every pending document
    pub async fn run(&mut self) -> Result<ScrapeReport> {
        if self.options.rescrape {
            let reset = self.registry.reset_scraped();
            self.registry.begin_run();
            tracing::info!("Rescrape requested: cleared {} scraped flags", reset);
        }

        let pending = self.registry.pending_ids();
        tracing::info!(
            "Starting scrape: {} of {} documents pending",
            pending.len(),
            self.registry.len()
        );

        let mut report = ScrapeReport::default();
        for id in &pending {
            let Some(record) = self.registry.get(id).cloned() else {
                continue;
            };

            match self.scrape_document(&record).await {
                Ok(()) => {
                    self.registry.mark_scraped(&record.id);
                    report.scraped += 1;
                }
                Err(HarvestError::ExtractionInvalid { id, reason }) => {
                    tracing::warn!(
                        "Extraction for document {} ({}) is invalid: {}",
                        id,
                        record.url,
                        reason
                    );
                    // A table left from an earlier scrape no longer matches the record
                    match self.ctx.workspace().table_store().remove(&id) {
                        Ok(true) => tracing::info!("Removed stale table for document {}", id),
                        Ok(false) => {}
                        Err(e) => tracing::warn!("Failed to remove stale table for {}: {}", id, e),
                    }
                    report.rejected.push(RejectedDocument {
                        id,
                        url: record.url.clone(),
                        reason,
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to scrape {} ({}): {}", record.id, record.url, e);
                }
            }
            report.attempted += 1;

            if report.attempted % self.options.save_interval == 0 {
                tracing::info!(
                    "Scraped {} new parallel documents ({} attempted).",
                    report.scraped,
                    report.attempted
                );
                self.checkpoint().await?;
            }
        }

        self.checkpoint().await?;
        report.pending = self.registry.pending_count();
        tracing::info!(
            "Scrape completed: {} scraped, {} rejected, {} still pending",
            report.scraped,
            report.rejected.len(),
            report.pending
        );
        Ok(report)
    }

    /// Extracts, validates and stores one document's table
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The table was written
    /// * `Err(HarvestError::ExtractionInvalid)` - Validation rejected the table
    /// * `Err(_)` - The table could not be written
    async fn scrape_document(&mut self, record: &DocumentRecord) -> Result<()> {
        let mut columns = Vec::with_capacity(record.languages.len());
        for lang in &record.languages {
            if let Some(segments) = self.extract_language(record, lang).await {
                columns.push(LanguageColumn::from_segments(lang, &segments));
            }
        }

        let table = ExtractedTable::assemble(columns);
        let validation = validate(&table, &record.languages);
        if !validation.is_valid() {
            return Err(HarvestError::ExtractionInvalid {
                id: record.id.clone(),
                reason: validation.reason,
            });
        }

        let path = self.ctx.workspace().table_store().write(&record.id, &table)?;
        tracing::info!(
            "Saved parallel text table at {} containing languages: {:?}",
            path.display(),
            record.languages
        );
        Ok(())
    }

    /// Renders one language and reads its text, reloading while it comes back
    /// empty
    ///
    /// Returns `None` if the language is missing or every attempt failed.
    async fn extract_language(&mut self, record: &DocumentRecord, lang: &str) -> Option<TextSegments> {
        let policy = self.options.retry.clone();
        let mut rendered = false;

        for attempt in 1..=policy.max_attempts() {
            let shown = if rendered {
                self.ctx.driver_mut().reload().await
            } else {
                self.ctx.driver_mut().render_language(&record.url, lang).await
            };

            match shown {
                Ok(()) => rendered = true,
                Err(e) if e.is_not_found() => {
                    tracing::warn!("'{}' is no longer offered at {}", lang, record.url);
                    return None;
                }
                Err(e) => {
                    tracing::warn!(
                        "Rendering '{}' for {} failed (attempt {}/{}): {}",
                        lang,
                        record.url,
                        attempt,
                        policy.max_attempts(),
                        e
                    );
                    continue;
                }
            }

            match self.ctx.driver_mut().current_text_segments().await {
                Ok(segments) if !segments.is_empty() => return Some(segments),
                Ok(_) => tracing::debug!(
                    "No text for '{}' at {} (attempt {}), reloading",
                    lang,
                    record.url,
                    attempt
                ),
                Err(e) => tracing::warn!("Reading text for '{}' at {} failed: {}", lang, record.url, e),
            }
        }

        policy.exhausted(RetryTarget::Document(record), lang);
        None
    }

    /// Saves the registry and clears the driver session
    async fn checkpoint(&mut self) -> Result<()> {
        let path = self.ctx.workspace().registry_path();
        self.registry.save(&path)?;
        self.ctx.clear_session().await;
        Ok(())
    }
}
