//! Bounded retry policy shared by probing and scraping
//!
//! Both loops retry a driver action a fixed number of times, reloading the
//! page in between, and then give up on that one language. What happens on
//! giving up is pluggable through an [`ExhaustionHook`].

use crate::state::DocumentRecord;
use std::fmt;
use std::sync::Arc;

/// What was being attempted when a retry budget ran out
#[derive(Debug, Clone, Copy)]
pub enum RetryTarget<'a> {
    /// Probing a URL for a language during the crawl
    Probe { url: &'a str },
    /// Extracting text for a registered document during the scrape
    Document(&'a DocumentRecord),
}

impl RetryTarget<'_> {
    pub fn url(&self) -> &str {
        match self {
            Self::Probe { url } => url,
            Self::Document(record) => &record.url,
        }
    }
}

/// Called once per target and language when every attempt has failed
pub trait ExhaustionHook: Send + Sync {
    fn on_exhausted(&self, target: RetryTarget<'_>, lang: &str);
}

/// Default hook: logs a warning and nothing else
#[derive(Debug, Default, Clone, Copy)]
pub struct LogExhaustion;

impl ExhaustionHook for LogExhaustion {
    fn on_exhausted(&self, target: RetryTarget<'_>, lang: &str) {
        match target {
            RetryTarget::Probe { url } => {
                tracing::warn!("Giving up probing '{}' at {}; treating it as absent", lang, url)
            }
            RetryTarget::Document(record) => tracing::warn!(
                "Giving up on '{}' for document {} ({}); language left out",
                lang,
                record.id,
                record.url
            ),
        }
    }
}

/// Retry budget plus the hook run when it is spent
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    hook: Arc<dyn ExhaustionHook>,
}

impl RetryPolicy {
    /// Creates a policy allowing `max_attempts` tries (at least one)
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            hook: Arc::new(LogExhaustion),
        }
    }

    /// Replaces the exhaustion hook
    pub fn with_hook(mut self, hook: Arc<dyn ExhaustionHook>) -> Self {
        self.hook = hook;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// True if another attempt is allowed after `attempt` (1-based) failed
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Runs the exhaustion hook
    pub fn exhausted(&self, target: RetryTarget<'_>, lang: &str) {
        self.hook.on_exhausted(target, lang);
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(String, String)>>);

    impl ExhaustionHook for Recorder {
        fn on_exhausted(&self, target: RetryTarget<'_>, lang: &str) {
            self.0
                .lock()
                .unwrap()
                .push((target.url().to_string(), lang.to_string()));
        }
    }

    #[test]
    fn test_attempt_budget() {
        let policy = RetryPolicy::new(3);
        assert!(policy.allows_retry(1));
        assert!(policy.allows_retry(2));
        assert!(!policy.allows_retry(3));

        assert_eq!(RetryPolicy::new(0).max_attempts(), 1);
        assert_eq!(RetryPolicy::default().max_attempts(), 3);
    }

    #[test]
    fn test_custom_hook() {
        let recorder = Arc::new(Recorder::default());
        let policy = RetryPolicy::new(2).with_hook(recorder.clone());

        let record = DocumentRecord::new("https://x/doc", vec!["kek".to_string()], "es");
        policy.exhausted(RetryTarget::Document(&record), "kek");
        policy.exhausted(RetryTarget::Probe { url: "https://x/p" }, "mam");

        let seen = recorder.0.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                ("https://x/doc".to_string(), "kek".to_string()),
                ("https://x/p".to_string(), "mam".to_string()),
            ]
        );
    }
}
