//! Crawl phase definitions
//!
//! A crawl run moves `Init -> (Resume) -> Probing -> Done`. The phase is logged
//! on every transition and reported at the end of the run.

use std::fmt;

/// Current phase of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Run created, nothing probed yet
    Init,

    /// Reconciling loaded checkpoints
    Resume,

    /// Walking the frontier
    Probing,

    /// Frontier exhausted or document cap reached
    Done,
}

impl CrawlPhase {
    /// Returns true if the transition to `next` is allowed
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Init, Self::Resume)
                | (Self::Init, Self::Probing)
                | (Self::Resume, Self::Probing)
                | (Self::Probing, Self::Done)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Resume => "resume",
            Self::Probing => "probing",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        assert!(CrawlPhase::Init.can_transition_to(CrawlPhase::Resume));
        assert!(CrawlPhase::Init.can_transition_to(CrawlPhase::Probing));
        assert!(CrawlPhase::Resume.can_transition_to(CrawlPhase::Probing));
        assert!(CrawlPhase::Probing.can_transition_to(CrawlPhase::Done));

        assert!(!CrawlPhase::Init.can_transition_to(CrawlPhase::Done));
        assert!(!CrawlPhase::Done.can_transition_to(CrawlPhase::Probing));
        assert!(!CrawlPhase::Probing.can_transition_to(CrawlPhase::Resume));
    }

    #[test]
    fn test_display() {
        assert_eq!(CrawlPhase::Probing.to_string(), "probing");
        assert!(CrawlPhase::Done.is_terminal());
        assert!(!CrawlPhase::Init.is_terminal());
    }
}
