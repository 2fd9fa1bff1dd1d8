//! Integration tests for the HTTP sitemap loader and page driver
//!
//! These tests use wiremock to serve a small multilingual site and run the
//! full harvest against it.

use parallel_harvest::config::parse_config;
use parallel_harvest::crawler::{run_crawl, run_scrape, ResumeMode, RunContext};
use parallel_harvest::driver::{HttpPageDriver, PageDriver};
use parallel_harvest::output::export_corpus;
use parallel_harvest::sitemap::{load_frontier, HttpSitemapLoader, SitemapSource};
use parallel_harvest::state::Registry;
use parallel_harvest::storage::Workspace;
use parallel_harvest::HarvestError;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Serves a sitemap index with one child sitemap and three pages:
/// `/es/a` (es + kek), `/es/b` (es only) and an excluded news page
async fn mount_site(server: &MockServer) {
    let base = server.uri();

    mount(
        server,
        "/sitemap.xml",
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>{base}/sitemap-pages.xml</loc></sitemap>
</sitemapindex>"#
        ),
    )
    .await;

    mount(
        server,
        "/sitemap-pages.xml",
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>{base}/es/a</loc></url>
  <url><loc>{base}/es/b</loc></url>
  <url><loc>{base}/es/noticias/hoy</loc></url>
</urlset>"#
        ),
    )
    .await;

    mount(
        server,
        "/es/a",
        r#"<html lang="es"><head>
<link rel="alternate" hreflang="kek" href="/kek/a">
</head><body>
<p id="p1">Uno</p>
<p id="p2">Dos
  y tres</p>
<figure><figcaption>Foto</figcaption></figure>
</body></html>"#
            .to_string(),
    )
    .await;

    mount(
        server,
        "/kek/a",
        r#"<html lang="kek"><head>
<link rel="alternate" hreflang="es" href="/es/a">
</head><body>
<p id="p1">Jun</p>
<p id="p2">Ka'ib</p>
<figure><figcaption>Jalam</figcaption></figure>
</body></html>"#
            .to_string(),
    )
    .await;

    mount(
        server,
        "/es/b",
        r#"<html lang="es"><body><p id="p1">Solo</p></body></html>"#.to_string(),
    )
    .await;
}

fn create_test_config(base: &str, working_dir: &Path) -> parallel_harvest::Config {
    parse_config(&format!(
        r#"
[site]
sitemap-url = "{base}"
exclude = ["noticias"]

[languages]
main = "es"
targets = ["es", "kek"]

[driver]
settle-delay-ms = 0
timeout-secs = 5

[output]
working-dir = "{}"
"#,
        working_dir.display()
    ))
    .expect("test config should be valid")
}

fn loader() -> HttpSitemapLoader {
    HttpSitemapLoader::new("parallel-harvest-test", Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_sitemap_index_is_followed() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let base = server.uri();

    let frontier = load_frontier(&loader(), &base, &["noticias".to_string()])
        .await
        .unwrap();

    assert_eq!(
        frontier.urls(),
        &[format!("{}/es/a", base), format!("{}/es/b", base)]
    );
}

#[tokio::test]
async fn test_missing_sitemap_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = loader().fetch_urls(&server.uri(), &[]).await;
    assert!(matches!(result, Err(HarvestError::SourceUnavailable { .. })));
}

#[tokio::test]
async fn test_http_driver_probes_and_extracts() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());
    let page = format!("{}/es/a", server.uri());

    let mut driver = HttpPageDriver::new(config.driver.clone()).unwrap();
    assert!(driver.probe_language(&page, "kek").await.is_ok());
    assert!(driver
        .probe_language(&page, "mam")
        .await
        .unwrap_err()
        .is_not_found());

    driver.render_language(&page, "kek").await.unwrap();
    let segments = driver.current_text_segments().await.unwrap();
    assert_eq!(segments.primary, vec!["Jun", "Ka'ib"]);
    assert_eq!(segments.secondary, vec!["Jalam"]);

    driver.reload().await.unwrap();
    driver.clear_session().await.unwrap();
    assert_eq!(driver.current_text_segments().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_full_harvest_over_http() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());
    let workspace = Workspace::new(dir.path());

    let driver = HttpPageDriver::new(config.driver.clone()).unwrap();
    let mut ctx = RunContext::new(driver, workspace.clone());
    let source = HttpSitemapLoader::from_config(&config).unwrap();

    let crawl = run_crawl(&mut ctx, &source, &config, ResumeMode::IfPresent)
        .await
        .unwrap();
    assert_eq!(crawl.urls_total, 2);
    assert_eq!(crawl.documents_total, 1);

    let scrape = run_scrape(&mut ctx, &config, false).await.unwrap();
    assert_eq!(scrape.scraped, 1);

    let registry = Registry::load(&workspace.registry_path()).unwrap();
    let record = registry.iter().next().unwrap();
    assert_eq!(record.url, format!("{}/es/a", server.uri()));
    assert_eq!(record.languages, vec!["es", "kek"]);
    assert!(record.is_scraped);

    let export = export_corpus(&workspace, &config).unwrap();
    assert_eq!(export.lines_for("kek"), 3);

    let pair = dir.path().join("text_es").join("es_kek");
    let main = std::fs::read_to_string(pair.join("data.es")).unwrap();
    let other = std::fs::read_to_string(pair.join("data.kek")).unwrap();
    assert_eq!(main, "Uno\nDos y tres\nFoto\n");
    assert_eq!(other, "Jun\nKa'ib\nJalam\n");
}
