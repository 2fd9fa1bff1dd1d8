//! HTTP page driver
//!
//! Renders language variants of static pages:
//! - The requested page is fetched once and cached for the probe loop
//! - A language is available if the page itself is in that language
//!   (`<html lang>`) or advertises an `<link rel="alternate" hreflang>` for it
//! - Paragraphs are located with the configured CSS selectors
//!
//! Cookies live in the client's cookie store; clearing the session rebuilds
//! the client.

use crate::config::DriverConfig;
use crate::driver::{DriverError, PageDriver, TextSegments};
use crate::ConfigError;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

/// A fetched page
#[derive(Debug, Clone)]
struct LoadedPage {
    /// URL that was requested
    url: String,
    body: String,
}

/// Page driver backed by plain HTTP requests
pub struct HttpPageDriver {
    config: DriverConfig,
    client: Client,
    /// The page as served at its own URL, kept while probing its languages
    source: Option<LoadedPage>,
    /// The language variant currently displayed
    current: Option<LoadedPage>,
}

impl HttpPageDriver {
    /// Creates a driver from validated configuration
    pub fn new(config: DriverConfig) -> Result<Self, ConfigError> {
        for selector in [&config.primary_selector, &config.secondary_selector] {
            Selector::parse(selector)
                .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))?;
        }

        let client = build_client(&config)
            .map_err(|e| ConfigError::Validation(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            client,
            source: None,
            current: None,
        })
    }

    async fn fetch(&self, url: &str) -> Result<LoadedPage, DriverError> {
        tracing::trace!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DriverError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DriverError::Navigation {
                url: url.to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        let body = response.text().await?;
        Ok(LoadedPage {
            url: url.to_string(),
            body,
        })
    }

    /// Returns the source page, fetching it unless it is already cached
    async fn source_page(&mut self, url: &str) -> Result<LoadedPage, DriverError> {
        if let Some(page) = self.source.as_ref().filter(|p| p.url == url) {
            return Ok(page.clone());
        }
        let page = self.fetch(url).await?;
        self.settle().await;
        self.source = Some(page.clone());
        Ok(page)
    }

    async fn settle(&self) {
        if self.config.settle_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.settle_delay_ms)).await;
        }
    }

    /// Resolves the URL of a language variant of `url`
    async fn locate_variant(&mut self, url: &str, lang: &str) -> Result<String, DriverError> {
        let source = self.source_page(url).await?;
        resolve_variant(&source.body, url, lang).ok_or_else(|| DriverError::LanguageNotFound {
            url: url.to_string(),
            lang: lang.to_string(),
        })
    }
}

#[async_trait]
impl PageDriver for HttpPageDriver {
    async fn render_language(&mut self, url: &str, lang: &str) -> Result<(), DriverError> {
        let target = self.locate_variant(url, lang).await?;

        let page = match self.source.as_ref().filter(|p| p.url == target) {
            Some(source) => source.clone(),
            None => {
                let page = self.fetch(&target).await?;
                self.settle().await;
                page
            }
        };

        tracing::debug!("Displaying {} in '{}' ({})", url, lang, target);
        self.current = Some(page);
        Ok(())
    }

    async fn probe_language(&mut self, url: &str, lang: &str) -> Result<(), DriverError> {
        self.locate_variant(url, lang).await.map(|_| ())
    }

    async fn current_text_segments(&mut self) -> Result<TextSegments, DriverError> {
        let page = self.current.as_ref().ok_or(DriverError::NoPage)?;
        Ok(extract_segments(
            &page.body,
            &self.config.primary_selector,
            &self.config.secondary_selector,
        ))
    }

    async fn reload(&mut self) -> Result<(), DriverError> {
        let url = self
            .current
            .as_ref()
            .map(|p| p.url.clone())
            .ok_or(DriverError::NoPage)?;

        let page = self.fetch(&url).await?;
        self.settle().await;
        if self.source.as_ref().map_or(false, |s| s.url == url) {
            self.source = Some(page.clone());
        }
        self.current = Some(page);
        Ok(())
    }

    async fn clear_session(&mut self) -> Result<(), DriverError> {
        self.client = build_client(&self.config)?;
        self.source = None;
        tracing::debug!("Cleared HTTP session");
        Ok(())
    }
}

/// Builds an HTTP client with a fresh cookie store
fn build_client(config: &DriverConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .build()
}

/// True if a language tag names the requested language
///
/// `es-ES` matches `es`; comparison ignores case.
fn tag_matches(tag: &str, lang: &str) -> bool {
    let tag = tag.trim();
    tag.eq_ignore_ascii_case(lang)
        || tag
            .split(['-', '_'])
            .next()
            .map_or(false, |primary| primary.eq_ignore_ascii_case(lang))
}

/// Finds the URL displaying `lang` for a page served at `page_url`
fn resolve_variant(html: &str, page_url: &str, lang: &str) -> Option<String> {
    let document = Html::parse_document(html);

    if let Ok(root) = Selector::parse("html[lang]") {
        let own_lang = document
            .select(&root)
            .next()
            .and_then(|el| el.value().attr("lang"));
        if own_lang.map_or(false, |tag| tag_matches(tag, lang)) {
            return Some(page_url.to_string());
        }
    }

    let alternates = Selector::parse("link[rel='alternate'][hreflang][href]").ok()?;
    let base = Url::parse(page_url).ok()?;

    // Exact tags win over region variants
    let mut fallback = None;
    for element in document.select(&alternates) {
        let (Some(tag), Some(href)) = (element.value().attr("hreflang"), element.value().attr("href"))
        else {
            continue;
        };
        let Ok(resolved) = base.join(href.trim()) else {
            continue;
        };
        if tag.trim().eq_ignore_ascii_case(lang) {
            return Some(resolved.to_string());
        }
        if fallback.is_none() && tag_matches(tag, lang) {
            fallback = Some(resolved.to_string());
        }
    }
    fallback
}

/// Collects the text of every node matching each selector, in document order
fn extract_segments(html: &str, primary: &str, secondary: &str) -> TextSegments {
    let document = Html::parse_document(html);
    TextSegments::new(
        select_text(&document, primary),
        select_text(&document, secondary),
    )
}

fn select_text(document: &Html, selector: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };
    document
        .select(&selector)
        .map(|el| {
            el.text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html lang="es"><head>
        <link rel="alternate" hreflang="kek" href="/kek/articulo">
        <link rel="alternate" hreflang="pt-BR" href="https://example.org/pt/artigo">
        <link rel="alternate" hreflang="mam" href="  /mam/articulo ">
        <link rel="stylesheet" href="/style.css">
        </head><body>
        <p id="p1">Primer   párrafo</p>
        <p id="p2"> </p>
        <p id="p3">Segundo <em>párrafo</em></p>
        <p class="note">fuera</p>
        <figure><figcaption>Una imagen</figcaption></figure>
        </body></html>"#;

    #[test]
    fn test_tag_matches() {
        assert!(tag_matches("es", "es"));
        assert!(tag_matches("ES-mx", "es"));
        assert!(tag_matches("pt_BR", "pt"));
        assert!(!tag_matches("est", "es"));
    }

    #[test]
    fn test_resolve_own_language() {
        let url = "https://example.org/es/articulo";
        assert_eq!(resolve_variant(PAGE, url, "es"), Some(url.to_string()));
    }

    #[test]
    fn test_resolve_alternates() {
        let url = "https://example.org/es/articulo";
        assert_eq!(
            resolve_variant(PAGE, url, "kek"),
            Some("https://example.org/kek/articulo".to_string())
        );
        assert_eq!(
            resolve_variant(PAGE, url, "mam"),
            Some("https://example.org/mam/articulo".to_string())
        );
        assert_eq!(
            resolve_variant(PAGE, url, "pt"),
            Some("https://example.org/pt/artigo".to_string())
        );
        assert_eq!(resolve_variant(PAGE, url, "tzo"), None);
    }

    #[test]
    fn test_extract_segments() {
        let segments = extract_segments(PAGE, "p[id^='p']", "figcaption");
        assert_eq!(segments.primary, vec!["Primer párrafo", "Segundo párrafo"]);
        assert_eq!(segments.secondary, vec!["Una imagen"]);
    }

    #[test]
    fn test_new_rejects_bad_selector() {
        let config = DriverConfig {
            secondary_selector: "figcaption[[".to_string(),
            ..DriverConfig::default()
        };
        assert!(matches!(
            HttpPageDriver::new(config),
            Err(ConfigError::InvalidSelector(_))
        ));
    }
}
