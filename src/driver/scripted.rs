//! In-memory page driver
//!
//! Serves a fixed set of pages and language variants from memory and records
//! every call it receives. Variants can be made flaky (the first renders come
//! back without text) or broken (navigation fails a number of times).

use crate::driver::{DriverError, PageDriver, TextSegments};
use async_trait::async_trait;
use std::collections::HashMap;

/// A call received by a [`ScriptedDriver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    Probe { url: String, lang: String },
    Render { url: String, lang: String },
    Segments,
    Reload,
    ClearSession,
}

type VariantKey = (String, String);

/// Page driver serving scripted content
#[derive(Debug, Default)]
pub struct ScriptedDriver {
    variants: HashMap<VariantKey, TextSegments>,
    /// Number of renders of a variant that still come back empty
    blank_renders: HashMap<VariantKey, u32>,
    /// Number of navigations to a variant that still fail
    failing_navigations: HashMap<VariantKey, u32>,
    current: Option<VariantKey>,
    current_blank: bool,
    calls: Vec<DriverCall>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a language variant of a page
    pub fn with_variant(mut self, url: &str, lang: &str, primary: &[&str], secondary: &[&str]) -> Self {
        self.variants.insert(
            key(url, lang),
            TextSegments::new(
                primary.iter().map(|s| s.to_string()).collect(),
                secondary.iter().map(|s| s.to_string()).collect(),
            ),
        );
        self
    }

    /// Adds a page offering the given languages, each with one paragraph
    pub fn with_page(mut self, url: &str, langs: &[&str]) -> Self {
        for lang in langs {
            let text = format!("{} [{}]", url, lang);
            self = self.with_variant(url, lang, &[text.as_str()], &[]);
        }
        self
    }

    /// Makes the first `times` renders of a variant return no text
    pub fn with_blank_renders(mut self, url: &str, lang: &str, times: u32) -> Self {
        self.blank_renders.insert(key(url, lang), times);
        self
    }

    /// Makes the first `times` navigations to a variant fail
    pub fn with_failing_navigation(mut self, url: &str, lang: &str, times: u32) -> Self {
        self.failing_navigations.insert(key(url, lang), times);
        self
    }

    /// Every call received so far
    pub fn calls(&self) -> &[DriverCall] {
        &self.calls
    }

    /// Number of probes issued for a URL
    pub fn probes_for(&self, url: &str) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, DriverCall::Probe { url: u, .. } if u == url))
            .count()
    }

    /// Number of calls matching a predicate
    pub fn count(&self, predicate: impl Fn(&DriverCall) -> bool) -> usize {
        self.calls.iter().filter(|c| predicate(c)).count()
    }

    fn navigate(&mut self, url: &str, lang: &str) -> Result<VariantKey, DriverError> {
        let variant = key(url, lang);
        if let Some(remaining) = self.failing_navigations.get_mut(&variant) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(DriverError::Navigation {
                    url: url.to_string(),
                    message: "scripted navigation failure".to_string(),
                });
            }
        }
        if !self.variants.contains_key(&variant) {
            return Err(DriverError::LanguageNotFound {
                url: url.to_string(),
                lang: lang.to_string(),
            });
        }
        Ok(variant)
    }

    fn display(&mut self, variant: VariantKey) {
        self.current_blank = match self.blank_renders.get_mut(&variant) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        };
        self.current = Some(variant);
    }
}

fn key(url: &str, lang: &str) -> VariantKey {
    (url.to_string(), lang.to_string())
}

#[async_trait]
impl PageDriver for ScriptedDriver {
    async fn render_language(&mut self, url: &str, lang: &str) -> Result<(), DriverError> {
        self.calls.push(DriverCall::Render {
            url: url.to_string(),
            lang: lang.to_string(),
        });
        let variant = self.navigate(url, lang)?;
        self.display(variant);
        Ok(())
    }

    async fn probe_language(&mut self, url: &str, lang: &str) -> Result<(), DriverError> {
        self.calls.push(DriverCall::Probe {
            url: url.to_string(),
            lang: lang.to_string(),
        });
        self.navigate(url, lang).map(|_| ())
    }

    async fn current_text_segments(&mut self) -> Result<TextSegments, DriverError> {
        self.calls.push(DriverCall::Segments);
        let variant = self.current.as_ref().ok_or(DriverError::NoPage)?;
        if self.current_blank {
            return Ok(TextSegments::default());
        }
        Ok(self.variants.get(variant).cloned().unwrap_or_default())
    }

    async fn reload(&mut self) -> Result<(), DriverError> {
        self.calls.push(DriverCall::Reload);
        let variant = self.current.clone().ok_or(DriverError::NoPage)?;
        self.display(variant);
        Ok(())
    }

    async fn clear_session(&mut self) -> Result<(), DriverError> {
        self.calls.push(DriverCall::ClearSession);
        Ok(())
    }
}
