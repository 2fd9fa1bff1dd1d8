//! Integration tests for the harvest phases
//!
//! These tests drive the crawl, scrape and export phases end-to-end against an
//! in-memory site and a temporary working directory.

use async_trait::async_trait;
use parallel_harvest::config::{parse_config, Config};
use parallel_harvest::crawler::{run_crawl, run_scrape, ResumeMode, RunContext};
use parallel_harvest::driver::{DriverCall, ScriptedDriver};
use parallel_harvest::output::{export_corpus, RunTotals};
use parallel_harvest::sitemap::{apply_exclusions, SitemapSource};
use parallel_harvest::state::{DocumentRecord, Frontier, Registry};
use parallel_harvest::storage::Workspace;
use parallel_harvest::HarvestError;
use std::path::Path;
use tempfile::TempDir;

const A: &str = "https://site.test/es/a";
const B: &str = "https://site.test/es/b";
const C: &str = "https://site.test/es/c";

/// Sitemap source serving a fixed URL list
struct StaticSitemap(Vec<&'static str>);

#[async_trait]
impl SitemapSource for StaticSitemap {
    async fn fetch_urls(
        &self,
        _origin: &str,
        exclude: &[String],
    ) -> parallel_harvest::Result<Vec<String>> {
        let urls = self.0.iter().map(|s| s.to_string()).collect();
        Ok(apply_exclusions(urls, exclude))
    }
}

/// Creates a test configuration rooted at the given working directory
fn create_test_config(working_dir: &Path, max_documents: usize, save_interval: usize) -> Config {
    parse_config(&format!(
        r#"
[site]
sitemap-url = "https://site.test/es/"

[languages]
main = "es"
targets = ["es", "kek", "mam"]

[crawler]
save-interval = {save_interval}
max-documents = {max_documents}

[scraper]
save-interval = {save_interval}
max-attempts = 2

[driver]
settle-delay-ms = 0

[output]
working-dir = "{}"
"#,
        working_dir.display()
    ))
    .expect("test config should be valid")
}

/// A exposes {es, kek}, B only {es}, C {kek, mam}
fn three_page_site() -> ScriptedDriver {
    ScriptedDriver::new()
        .with_variant(A, "es", &["Uno", "Dos"], &["Pie"])
        .with_variant(A, "kek", &["Jun", "Ka'ib"], &["Xe'"])
        .with_page(B, &["es"])
        .with_variant(C, "kek", &["Oxib"], &[])
        .with_variant(C, "mam", &["Oxe"], &[])
}

fn registered_urls(workspace: &Workspace) -> Vec<String> {
    Registry::load(&workspace.registry_path())
        .unwrap()
        .iter()
        .map(|r| r.url.clone())
        .collect()
}

fn registry_records(workspace: &Workspace) -> Vec<DocumentRecord> {
    Registry::load(&workspace.registry_path())
        .unwrap()
        .iter()
        .cloned()
        .collect()
}

fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(String::from)
        .collect()
}

#[tokio::test]
async fn test_crawl_registers_parallel_documents() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), 0, 50);
    let workspace = Workspace::new(dir.path());
    let mut ctx = RunContext::new(three_page_site(), workspace.clone());

    let report = run_crawl(&mut ctx, &StaticSitemap(vec![A, B, C]), &config, ResumeMode::Fresh)
        .await
        .unwrap();

    assert_eq!(report.documents_total, 2);
    assert_eq!(report.urls_visited, 3);
    assert_eq!(registered_urls(&workspace), vec![A, C]);

    // B was probed and marked visited but never registered
    let frontier = Frontier::load(&workspace.frontier_path()).unwrap();
    assert!(frontier.is_visited(B));
    assert_eq!(ctx.driver().probes_for(B), 3);
}

#[tokio::test]
async fn test_resume_after_cap_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let workspace = Workspace::new(dir.path());
    let mut ctx = RunContext::new(three_page_site(), workspace.clone());
    let source = StaticSitemap(vec![A, B, C]);

    // First run stops once A is registered
    let capped = create_test_config(dir.path(), 1, 50);
    let first = run_crawl(&mut ctx, &source, &capped, ResumeMode::Fresh)
        .await
        .unwrap();
    assert!(first.cap_reached);
    assert_eq!(first.urls_visited, 1);

    // Second run picks up B and C only
    let unbounded = create_test_config(dir.path(), 0, 50);
    let second = run_crawl(&mut ctx, &source, &unbounded, ResumeMode::Required)
        .await
        .unwrap();
    assert_eq!(second.urls_processed, 2);
    assert_eq!(second.documents_total, 2);
    let after_second = registry_records(&workspace);

    // A third run finds nothing left to do and leaves the registry as it was
    let third = run_crawl(&mut ctx, &source, &unbounded, ResumeMode::IfPresent)
        .await
        .unwrap();
    assert_eq!(third.urls_processed, 0);
    assert_eq!(registry_records(&workspace), after_second);

    assert_eq!(registered_urls(&workspace), vec![A, C]);
    assert_eq!(ctx.driver().probes_for(A), 3);
    assert_eq!(ctx.driver().probes_for(C), 3);
}

#[tokio::test]
async fn test_resume_tolerates_registry_ahead_of_frontier() {
    let dir = TempDir::new().unwrap();
    let workspace = Workspace::new(dir.path());
    let config = create_test_config(dir.path(), 0, 50);

    // Interrupted between the registry save and the frontier save
    let mut registry = Registry::new();
    registry.insert(DocumentRecord::new(
        A,
        vec!["es".to_string(), "kek".to_string()],
        "es",
    ));
    registry.save(&workspace.registry_path()).unwrap();
    Frontier::from_urls([A, B, C])
        .save(&workspace.frontier_path())
        .unwrap();

    let mut ctx = RunContext::new(three_page_site(), workspace.clone());
    let report = run_crawl(&mut ctx, &StaticSitemap(vec![]), &config, ResumeMode::IfPresent)
        .await
        .unwrap();

    assert_eq!(report.urls_reconciled, 1);
    assert_eq!(ctx.driver().probes_for(A), 0);
    assert_eq!(registered_urls(&workspace), vec![A, C]);
}

#[tokio::test]
async fn test_required_resume_without_checkpoint_fails() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), 0, 50);
    let mut ctx = RunContext::new(three_page_site(), Workspace::new(dir.path()));

    let result = run_crawl(&mut ctx, &StaticSitemap(vec![A]), &config, ResumeMode::Required).await;
    assert!(matches!(result, Err(HarvestError::CheckpointMissing { .. })));
}

#[tokio::test]
async fn test_scrape_without_registry_fails() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), 0, 50);
    let mut ctx = RunContext::new(three_page_site(), Workspace::new(dir.path()));

    let result = run_scrape(&mut ctx, &config, false).await;
    assert!(matches!(result, Err(HarvestError::CheckpointMissing { .. })));
}

#[tokio::test]
async fn test_missing_secondary_segment_fails_validation() {
    let dir = TempDir::new().unwrap();
    let workspace = Workspace::new(dir.path());
    let config = create_test_config(dir.path(), 0, 50);

    let driver = ScriptedDriver::new()
        .with_variant(A, "es", &["Uno", "Dos"], &["Pie"])
        .with_variant(A, "kek", &["Jun", "Ka'ib"], &[]);
    let mut ctx = RunContext::new(driver, workspace.clone());

    let mut registry = Registry::new();
    let record = DocumentRecord::new(A, vec!["es".to_string(), "kek".to_string()], "es");
    let id = record.id.clone();
    registry.insert(record);
    registry.save(&workspace.registry_path()).unwrap();

    let report = run_scrape(&mut ctx, &config, false).await.unwrap();
    assert_eq!(report.scraped, 0);
    assert_eq!(report.rejected.len(), 1);
    assert!(report.rejected[0].reason.contains("secondary-1/kek"));

    let registry = Registry::load(&workspace.registry_path()).unwrap();
    assert!(!registry.get(&id).unwrap().is_scraped);
    assert!(!workspace.table_store().path_for(&id).exists());
}

#[tokio::test]
async fn test_rescrape_processes_every_record() {
    let dir = TempDir::new().unwrap();
    let workspace = Workspace::new(dir.path());
    let config = create_test_config(dir.path(), 0, 50);
    let mut ctx = RunContext::new(three_page_site(), workspace.clone());

    run_crawl(&mut ctx, &StaticSitemap(vec![A, B, C]), &config, ResumeMode::Fresh)
        .await
        .unwrap();
    let first = run_scrape(&mut ctx, &config, false).await.unwrap();
    assert_eq!(first.scraped, 2);

    // Nothing pending without the rescrape flag
    let idle = run_scrape(&mut ctx, &config, false).await.unwrap();
    assert_eq!(idle.attempted, 0);

    let renders_before = ctx
        .driver()
        .count(|c| matches!(c, DriverCall::Render { .. }));
    let again = run_scrape(&mut ctx, &config, true).await.unwrap();
    let renders_after = ctx
        .driver()
        .count(|c| matches!(c, DriverCall::Render { .. }));

    assert_eq!(again.attempted, 2);
    assert_eq!(again.scraped, 2);
    // A in es and kek, C in kek and mam
    assert_eq!(renders_after - renders_before, 4);
}

#[tokio::test]
async fn test_full_harvest_exports_aligned_pairs() {
    let dir = TempDir::new().unwrap();
    let workspace = Workspace::new(dir.path());
    let config = create_test_config(dir.path(), 0, 1);
    let mut ctx = RunContext::new(three_page_site(), workspace.clone());

    run_crawl(&mut ctx, &StaticSitemap(vec![A, B, C]), &config, ResumeMode::Fresh)
        .await
        .unwrap();
    run_scrape(&mut ctx, &config, false).await.unwrap();
    let report = export_corpus(&workspace, &config).unwrap();

    // C has no es column, so only A can be paired with the main language
    assert_eq!(report.tables_read, 2);
    assert_eq!(report.tables_exported, 1);
    assert_eq!(report.lines_for("kek"), 3);

    let pair = dir.path().join("text_es").join("es_kek");
    assert_eq!(read_lines(&pair.join("data.es")), vec!["Uno", "Dos", "Pie"]);
    assert_eq!(read_lines(&pair.join("data.kek")), vec!["Jun", "Ka'ib", "Xe'"]);

    let totals = RunTotals::load(&workspace).unwrap();
    assert_eq!(totals.urls_visited, 3);
    assert_eq!(totals.documents_confirmed, 2);
    assert_eq!(totals.documents_scraped, 2);
    assert_eq!(totals.documents_pending, 0);
}

#[tokio::test]
async fn test_failed_rescrape_drops_document_from_export() {
    let dir = TempDir::new().unwrap();
    let workspace = Workspace::new(dir.path());
    let config = create_test_config(dir.path(), 0, 50);
    let mut ctx = RunContext::new(three_page_site(), workspace.clone());

    run_crawl(&mut ctx, &StaticSitemap(vec![A, B, C]), &config, ResumeMode::Fresh)
        .await
        .unwrap();
    run_scrape(&mut ctx, &config, false).await.unwrap();
    assert_eq!(export_corpus(&workspace, &config).unwrap().lines_for("kek"), 3);

    // A's kek variant lost its caption since the first scrape
    let changed = ScriptedDriver::new()
        .with_variant(A, "es", &["Uno", "Dos"], &["Pie"])
        .with_variant(A, "kek", &["Jun", "Ka'ib"], &[])
        .with_variant(C, "kek", &["Oxib"], &[])
        .with_variant(C, "mam", &["Oxe"], &[]);
    let mut ctx = RunContext::new(changed, workspace.clone());
    let rescrape = run_scrape(&mut ctx, &config, true).await.unwrap();
    assert_eq!(rescrape.rejected.len(), 1);

    let registry = Registry::load(&workspace.registry_path()).unwrap();
    let a = registry.iter().find(|r| r.url == A).unwrap();
    assert!(!a.is_scraped);
    assert!(!workspace.table_store().path_for(&a.id).exists());

    let report = export_corpus(&workspace, &config).unwrap();
    assert_eq!(report.lines_for("kek"), 0);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("text_es/es_kek/data.kek")).unwrap_or_default(),
        ""
    );
}

#[tokio::test]
async fn test_fresh_crawl_does_not_duplicate_corpus() {
    let dir = TempDir::new().unwrap();
    let workspace = Workspace::new(dir.path());
    let config = create_test_config(dir.path(), 0, 50);
    let source = StaticSitemap(vec![A, B, C]);

    for _ in 0..2 {
        let mut ctx = RunContext::new(three_page_site(), workspace.clone());
        run_crawl(&mut ctx, &source, &config, ResumeMode::Fresh)
            .await
            .unwrap();
        run_scrape(&mut ctx, &config, false).await.unwrap();
    }

    let report = export_corpus(&workspace, &config).unwrap();
    assert_eq!(report.tables_read, 2);
    assert_eq!(report.tables_skipped, 2);
    assert_eq!(report.lines_for("kek"), 3);

    let pair = dir.path().join("text_es").join("es_kek");
    assert_eq!(read_lines(&pair.join("data.es")), vec!["Uno", "Dos", "Pie"]);
    assert_eq!(read_lines(&pair.join("data.kek")), vec!["Jun", "Ka'ib", "Xe'"]);
}
