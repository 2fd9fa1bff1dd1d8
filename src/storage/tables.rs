//! Per-document TSV tables
//!
//! Each scraped document is stored as `<id>.tsv`: a header of `label` followed
//! by one column per language, then one row per paragraph label.

use crate::document::ExtractedTable;
use crate::{HarvestError, Result};
use csv::{ReaderBuilder, WriterBuilder};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const LABEL_HEADER: &str = "label";
const TABLE_EXTENSION: &str = "tsv";

/// Directory of per-document tables
#[derive(Debug, Clone)]
pub struct TableStore {
    dir: PathBuf,
}

/// A table read back from disk
///
/// Columns are kept exactly as found: a ragged row leaves the affected columns
/// shorter than the label list, which the exporter reports as a mismatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTable {
    pub name: String,
    pub languages: Vec<String>,
    pub labels: Vec<String>,
    columns: HashMap<String, Vec<String>>,
}

impl StoredTable {
    /// Values of a language column, if the table has one
    pub fn column(&self, lang: &str) -> Option<&[String]> {
        self.columns.get(lang).map(Vec::as_slice)
    }

    /// True if the table has a column for the language
    pub fn has_language(&self, lang: &str) -> bool {
        self.columns.contains_key(lang)
    }
}

impl TableStore {
    /// Creates a store over the given directory (created lazily on write)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory backing this store
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the table for a document id
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", id, TABLE_EXTENSION))
    }

    /// Writes a document table, replacing any previous version atomically
    pub fn write(&self, id: &str, table: &ExtractedTable) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(id);

        let tmp = NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = WriterBuilder::new()
                .delimiter(b'\t')
                .from_writer(tmp.as_file());

            let mut header = Vec::with_capacity(table.languages().len() + 1);
            header.push(LABEL_HEADER);
            header.extend(table.languages().iter().map(String::as_str));
            writer.write_record(&header)?;

            for (row, label) in table.labels().iter().enumerate() {
                let mut record = vec![label.to_string()];
                for col in 0..table.languages().len() {
                    record.push(table.cell(row, col).unwrap_or_default().to_string());
                }
                writer.write_record(&record)?;
            }
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| HarvestError::Io(e.error))?;

        Ok(path)
    }

    /// Deletes the table for a document id; returns `false` if there was none
    pub fn remove(&self, id: &str) -> Result<bool> {
        match std::fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Lists table files, sorted by file name
    ///
    /// A missing directory yields an empty list.
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file()
                && path.extension().and_then(|e| e.to_str()) == Some(TABLE_EXTENSION)
            {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Reads a table file
    pub fn read(&self, path: &Path) -> Result<StoredTable> {
        read_table(path)
    }
}

/// Reads a TSV table written by [`TableStore::write`]
pub fn read_table(path: &Path) -> Result<StoredTable> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let languages: Vec<String> = reader
        .headers()?
        .iter()
        .skip(1)
        .map(|h| h.to_string())
        .collect();

    let mut labels = Vec::new();
    let mut columns: HashMap<String, Vec<String>> = languages
        .iter()
        .map(|lang| (lang.clone(), Vec::new()))
        .collect();

    for record in reader.records() {
        let record = record?;
        labels.push(record.get(0).unwrap_or_default().to_string());
        for (i, lang) in languages.iter().enumerate() {
            if let Some(value) = record.get(i + 1) {
                if let Some(column) = columns.get_mut(lang) {
                    column.push(value.to_string());
                }
            }
        }
    }

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(StoredTable {
        name,
        languages,
        labels,
        columns,
    })
}
