//! Storage module for persisting harvest progress
//!
//! This module handles everything that lives in the working directory:
//! - Atomic JSON checkpoints for the frontier and the document registry
//! - Run timing stored alongside each checkpoint
//! - Per-document TSV tables produced by the scrape phase

mod checkpoint;
mod tables;

pub use checkpoint::{
    epoch_seconds, if_present, read_checkpoint, write_checkpoint, RunTiming, LAST_SAVED_KEY, START_TIME_KEY,
};
pub use tables::{read_table, StoredTable, TableStore};

use std::path::{Path, PathBuf};

/// File name of the frontier checkpoint
pub const FRONTIER_FILE: &str = "visited_urls.json";

/// File name of the registry checkpoint
pub const REGISTRY_FILE: &str = "parallel_documents.json";

/// Directory holding one TSV table per scraped document
pub const TABLES_DIR: &str = "tables";

/// Layout of a harvest working directory
///
/// A working directory must be owned by a single run at a time. Nothing here
/// takes a lock; running two jobs against the same directory is unsupported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Creates a workspace rooted at the given directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The working directory itself
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the frontier checkpoint
    pub fn frontier_path(&self) -> PathBuf {
        self.root.join(FRONTIER_FILE)
    }

    /// Path of the registry checkpoint
    pub fn registry_path(&self) -> PathBuf {
        self.root.join(REGISTRY_FILE)
    }

    /// Directory of per-document tables
    pub fn tables_dir(&self) -> PathBuf {
        self.root.join(TABLES_DIR)
    }

    /// Root of the exported corpus for a main language
    pub fn corpus_dir(&self, main_language: &str) -> PathBuf {
        self.root.join(format!("text_{}", main_language))
    }

    /// Table store backed by this workspace
    pub fn table_store(&self) -> TableStore {
        TableStore::new(self.tables_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_layout() {
        let ws = Workspace::new("/data/harvest");
        assert_eq!(
            ws.frontier_path(),
            PathBuf::from("/data/harvest/visited_urls.json")
        );
        assert_eq!(
            ws.registry_path(),
            PathBuf::from("/data/harvest/parallel_documents.json")
        );
        assert_eq!(ws.tables_dir(), PathBuf::from("/data/harvest/tables"));
        assert_eq!(ws.corpus_dir("es"), PathBuf::from("/data/harvest/text_es"));
    }
}
