//! Run totals from the checkpoint files
//!
//! This module provides functionality for extracting and displaying harvest
//! progress from the working directory.

use crate::state::{Frontier, Registry};
use crate::storage::{if_present, Workspace};
use crate::Result;
use chrono::{TimeZone, Utc};

/// Progress totals reported at the end of every run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTotals {
    pub urls_total: usize,
    pub urls_visited: usize,
    pub documents_confirmed: usize,
    pub documents_scraped: usize,
    pub documents_pending: usize,
    /// Epoch seconds of the frontier's first start, if known
    pub started_at: Option<i64>,
    /// Epoch seconds of the latest checkpoint of either file, if known
    pub last_saved: Option<i64>,
}

impl RunTotals {
    /// Computes totals from in-memory state
    pub fn from_state(frontier: Option<&Frontier>, registry: Option<&Registry>) -> Self {
        let mut totals = Self::default();

        if let Some(frontier) = frontier {
            totals.urls_total = frontier.len();
            totals.urls_visited = frontier.visited_count();
            totals.started_at = Some(frontier.timing().started_at);
            totals.last_saved = Some(frontier.timing().last_saved);
        }

        if let Some(registry) = registry {
            totals.documents_confirmed = registry.len();
            totals.documents_scraped = registry.scraped_count();
            totals.documents_pending = registry.pending_count();
            let saved = registry.timing().last_saved;
            totals.last_saved = Some(totals.last_saved.map_or(saved, |t| t.max(saved)));
        }

        totals
    }

    /// Loads totals from the checkpoints in a working directory
    ///
    /// A missing checkpoint counts as zero; a malformed one is an error.
    pub fn load(workspace: &Workspace) -> Result<Self> {
        let frontier = if_present(Frontier::load(&workspace.frontier_path()))?;
        let registry = if_present(Registry::load(&workspace.registry_path()))?;
        Ok(Self::from_state(frontier.as_ref(), registry.as_ref()))
    }

    /// Loads and logs the totals, warning instead of failing if a checkpoint
    /// cannot be read
    ///
    /// Used on the error path of a run, where the original error matters more.
    pub fn log_from(workspace: &Workspace) -> Option<Self> {
        match Self::load(workspace) {
            Ok(totals) => {
                totals.log();
                Some(totals)
            }
            Err(e) => {
                tracing::warn!("Could not compute totals: {}", e);
                None
            }
        }
    }

    /// Percentage of frontier URLs already probed
    pub fn visited_rate(&self) -> f64 {
        if self.urls_total == 0 {
            0.0
        } else {
            self.urls_visited as f64 / self.urls_total as f64 * 100.0
        }
    }

    /// Logs the totals at info level
    pub fn log(&self) {
        tracing::info!(
            "Totals: {}/{} URLs visited, {} documents confirmed, {} scraped, {} pending",
            self.urls_visited,
            self.urls_total,
            self.documents_confirmed,
            self.documents_scraped,
            self.documents_pending
        );
    }
}

/// Formats an epoch timestamp for display
pub fn format_epoch(secs: i64) -> String {
    match Utc.timestamp_opt(secs, 0).single() {
        Some(t) => t.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => secs.to_string(),
    }
}

/// Prints totals to stdout in a formatted manner
pub fn print_totals(totals: &RunTotals) {
    println!("=== Harvest Statistics ===\n");

    println!("Frontier:");
    println!("  Total URLs: {}", totals.urls_total);
    println!(
        "  Visited: {} ({:.1}%)",
        totals.urls_visited,
        totals.visited_rate()
    );
    println!();

    println!("Parallel documents:");
    println!("  Confirmed: {}", totals.documents_confirmed);
    println!("  Scraped: {}", totals.documents_scraped);
    println!("  Pending: {}", totals.documents_pending);
    println!();

    if let Some(started) = totals.started_at {
        println!("First started: {}", format_epoch(started));
    }
    if let Some(saved) = totals.last_saved {
        println!("Last saved: {}", format_epoch(saved));
    }
}
