//! State module for tracking harvest progress
//!
//! # Components
//!
//! - `Frontier`: candidate URLs and whether each has been probed
//! - `Registry`: confirmed parallel documents and whether each has been scraped
//! - `CrawlPhase`: phase of a crawl run

mod frontier;
mod phase;
mod registry;

// Re-export main types
pub use frontier::Frontier;
pub use phase::CrawlPhase;
pub use registry::{DocumentRecord, Registry};
