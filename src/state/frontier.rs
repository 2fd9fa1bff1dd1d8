//! URL frontier with visited flags
//!
//! The frontier is the fixed set of candidate URLs for a site. Order is the
//! order in which URLs were first seen and is preserved across checkpoints so a
//! resumed crawl probes the remaining URLs in the same sequence.

use crate::storage::{read_checkpoint, write_checkpoint, RunTiming};
use crate::{HarvestError, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;

/// Candidate URLs and their visited status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frontier {
    order: Vec<String>,
    visited: HashMap<String, bool>,
    timing: RunTiming,
}

impl Frontier {
    /// Creates a frontier with every URL unvisited
    ///
    /// Duplicates are collapsed; the first occurrence fixes the position.
    pub fn from_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut frontier = Self {
            order: Vec::new(),
            visited: HashMap::new(),
            timing: RunTiming::start_now(),
        };
        for url in urls {
            frontier.insert(url.into(), false);
        }
        frontier
    }

    fn insert(&mut self, url: String, visited: bool) {
        if !self.visited.contains_key(&url) {
            self.order.push(url.clone());
            self.visited.insert(url, visited);
        }
    }

    /// Loads a frontier checkpoint
    ///
    /// # Returns
    ///
    /// * `Err(HarvestError::CheckpointMissing)` - No checkpoint at `path`
    /// * `Err(HarvestError::Checkpoint)` - A value is not a boolean
    pub fn load(path: &Path) -> Result<Self> {
        let mut map = read_checkpoint(path)?;
        let timing = RunTiming::take_from(&mut map, path)?.unwrap_or_else(RunTiming::start_now);

        let mut frontier = Self {
            order: Vec::with_capacity(map.len()),
            visited: HashMap::with_capacity(map.len()),
            timing,
        };
        for (url, value) in map {
            let visited = value.as_bool().ok_or_else(|| HarvestError::Checkpoint {
                path: path.to_path_buf(),
                message: format!("visited flag for {} is not a boolean", url),
            })?;
            frontier.insert(url, visited);
        }

        tracing::info!(
            "Loaded frontier with {} URLs ({} visited) from {}",
            frontier.len(),
            frontier.visited_count(),
            path.display()
        );
        Ok(frontier)
    }

    /// Writes the whole frontier to `path`, replacing the previous snapshot
    ///
    /// Stamps the last-saved time before writing.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.timing.touch();

        let mut map = Map::with_capacity(self.order.len() + 2);
        for url in &self.order {
            let visited = self.visited.get(url).copied().unwrap_or(false);
            map.insert(url.clone(), Value::Bool(visited));
        }
        self.timing.insert_into(&mut map);

        write_checkpoint(path, &map)?;
        tracing::info!(
            "Saved frontier: {} of {} URLs visited",
            self.visited_count(),
            self.len()
        );
        Ok(())
    }

    /// Unvisited URLs in frontier order
    pub fn pending_urls(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|url| !self.is_visited(url))
            .cloned()
            .collect()
    }

    /// Marks a URL as visited
    ///
    /// Returns `true` if the flag changed. Unknown URLs are ignored.
    pub fn mark_visited(&mut self, url: &str) -> bool {
        match self.visited.get_mut(url) {
            Some(flag) if !*flag => {
                *flag = true;
                true
            }
            Some(_) => false,
            None => {
                tracing::debug!("Ignoring visit of URL outside the frontier: {}", url);
                false
            }
        }
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.get(url).copied().unwrap_or(false)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.visited.contains_key(url)
    }

    /// All URLs in frontier order
    pub fn urls(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.values().filter(|v| **v).count()
    }

    pub fn pending_count(&self) -> usize {
        self.len() - self.visited_count()
    }

    pub fn timing(&self) -> RunTiming {
        self.timing
    }

    /// Starts timing a new run over this frontier
    pub fn begin_run(&mut self) {
        self.timing = RunTiming::start_now();
    }
}
