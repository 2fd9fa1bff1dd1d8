//! Registry of confirmed parallel documents
//!
//! Every document gets a surrogate id when it is registered. The id, not the
//! URL, names the document's table on disk, so storage never depends on URL
//! length or characters.

use crate::storage::{read_checkpoint, write_checkpoint, RunTiming};
use crate::{HarvestError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Map;
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

/// A page confirmed to exist in more than the main language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    pub id: String,
    pub url: String,
    pub languages: Vec<String>,
    pub main_language: String,
    pub is_scraped: bool,
}

impl DocumentRecord {
    /// Creates an unscraped record with a fresh surrogate id
    pub fn new(url: &str, languages: Vec<String>, main_language: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            url: url.to_string(),
            languages,
            main_language: main_language.to_string(),
            is_scraped: false,
        }
    }

    /// Decides whether a probed language set makes a parallel document
    ///
    /// The set must be non-empty and must not consist of the main language
    /// alone.
    pub fn qualifies(languages: &[String], main_language: &str) -> bool {
        !languages.is_empty() && languages.iter().any(|lang| lang != main_language)
    }
}

/// On-disk shape of a record
///
/// Older snapshots were keyed by URL and used `langs` / `main_lang`.
#[derive(Debug, Serialize, Deserialize)]
struct RecordEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(alias = "langs")]
    languages: Vec<String>,
    #[serde(alias = "main_lang")]
    main_language: String,
    #[serde(default)]
    is_scraped: bool,
}

/// Ordered collection of document records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    records: Vec<DocumentRecord>,
    timing: RunTiming,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            timing: RunTiming::start_now(),
        }
    }

    /// Loads a registry checkpoint
    ///
    /// Entries without a `url` field come from snapshots keyed by URL; they get
    /// a surrogate id on load.
    pub fn load(path: &Path) -> Result<Self> {
        let mut map = read_checkpoint(path)?;
        let timing = RunTiming::take_from(&mut map, path)?.unwrap_or_else(RunTiming::start_now);

        let mut registry = Self {
            records: Vec::with_capacity(map.len()),
            timing,
        };
        let mut migrated = 0;
        for (key, value) in map {
            let entry: RecordEntry =
                serde_json::from_value(value).map_err(|e| HarvestError::Checkpoint {
                    path: path.to_path_buf(),
                    message: format!("record {}: {}", key, e),
                })?;

            let record = match entry.url {
                Some(url) => DocumentRecord {
                    id: key.clone(),
                    url,
                    languages: entry.languages,
                    main_language: entry.main_language,
                    is_scraped: entry.is_scraped,
                },
                None => {
                    migrated += 1;
                    DocumentRecord {
                        is_scraped: entry.is_scraped,
                        ..DocumentRecord::new(&key, entry.languages, &entry.main_language)
                    }
                }
            };

            if !registry.insert(record) {
                tracing::warn!("Dropping duplicate registry entry for {}", key);
            }
        }

        if migrated > 0 {
            tracing::info!("Assigned surrogate ids to {} URL-keyed records", migrated);
        }
        tracing::info!(
            "Loaded {} parallel documents ({} scraped) from {}",
            registry.len(),
            registry.scraped_count(),
            path.display()
        );
        Ok(registry)
    }

    /// Writes every record to `path`, replacing the previous snapshot
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.timing.touch();

        let mut map = Map::with_capacity(self.records.len() + 2);
        for record in &self.records {
            let entry = RecordEntry {
                url: Some(record.url.clone()),
                languages: record.languages.clone(),
                main_language: record.main_language.clone(),
                is_scraped: record.is_scraped,
            };
            map.insert(record.id.clone(), serde_json::to_value(entry)?);
        }
        self.timing.insert_into(&mut map);

        write_checkpoint(path, &map)?;
        tracing::info!(
            "Saved registry: {} documents, {} scraped",
            self.len(),
            self.scraped_count()
        );
        Ok(())
    }

    /// Appends a record
    ///
    /// Returns `false` and leaves the registry unchanged if a record with the
    /// same URL or id already exists.
    pub fn insert(&mut self, record: DocumentRecord) -> bool {
        if self
            .records
            .iter()
            .any(|r| r.url == record.url || r.id == record.id)
        {
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn get(&self, id: &str) -> Option<&DocumentRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.records.iter().any(|r| r.url == url)
    }

    /// URLs of every registered document
    pub fn urls(&self) -> HashSet<&str> {
        self.records.iter().map(|r| r.url.as_str()).collect()
    }

    /// Records in registry order
    pub fn iter(&self) -> impl Iterator<Item = &DocumentRecord> {
        self.records.iter()
    }

    /// Ids of unscraped records in registry order
    pub fn pending_ids(&self) -> Vec<String> {
        self.records
            .iter()
            .filter(|r| !r.is_scraped)
            .map(|r| r.id.clone())
            .collect()
    }

    /// Ids of scraped records
    pub fn scraped_ids(&self) -> HashSet<&str> {
        self.records
            .iter()
            .filter(|r| r.is_scraped)
            .map(|r| r.id.as_str())
            .collect()
    }

    /// Flags a record as scraped; returns `false` for unknown ids
    pub fn mark_scraped(&mut self, id: &str) -> bool {
        match self.records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record.is_scraped = true;
                true
            }
            None => false,
        }
    }

    /// Clears every scraped flag ahead of a rescrape
    ///
    /// Returns the number of records that were scraped before the reset.
    pub fn reset_scraped(&mut self) -> usize {
        let mut reset = 0;
        for record in &mut self.records {
            if record.is_scraped {
                record.is_scraped = false;
                reset += 1;
            }
        }
        reset
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn scraped_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_scraped).count()
    }

    pub fn pending_count(&self) -> usize {
        self.len() - self.scraped_count()
    }

    pub fn timing(&self) -> RunTiming {
        self.timing
    }

    /// Starts timing a new run over this registry
    pub fn begin_run(&mut self) {
        self.timing = RunTiming::start_now();
    }
}
