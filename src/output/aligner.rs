//! One-unit-per-line corpus export
//!
//! Pairs the main language column of every stored table with each other
//! language column and appends both to
//! `text_<main>/<main>_<other>/data.<main>` and `data.<other>`. Line `n` of one
//! file is the translation of line `n` of the other, so a table that would
//! break that correspondence contributes nothing at all.

use crate::document::RowLabel;
use crate::storage::{read_table, StoredTable, TableStore};
use crate::{HarvestError, Result};
use std::collections::{BTreeMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Lines taken from one table for one language pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedPair {
    pub other: String,
    pub main_lines: Vec<String>,
    pub other_lines: Vec<String>,
}

/// Outcome of an export
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub tables_read: usize,
    /// Tables on disk that belong to no scraped document
    pub tables_skipped: usize,
    pub tables_exported: usize,
    /// Names of tables left out, with the reason
    pub rejected: Vec<(String, String)>,
    /// Lines written per other language
    pub lines: BTreeMap<String, usize>,
}

impl ExportReport {
    pub fn lines_for(&self, other: &str) -> usize {
        self.lines.get(other).copied().unwrap_or(0)
    }
}

/// Flattens one cell onto a single line
fn to_line(cell: &str) -> String {
    cell.replace(['\r', '\n'], " ").trim().to_string()
}

/// Aligns the main column of a table with one other column
///
/// Fails with `HarvestError::AlignmentMismatch` if either column is missing,
/// the columns differ in length, or any entry is blank after trimming.
pub fn align_pair(table: &StoredTable, main: &str, other: &str) -> Result<AlignedPair> {
    let mismatch = |reason: String| HarvestError::AlignmentMismatch {
        table: table.name.clone(),
        main: main.to_string(),
        other: other.to_string(),
        reason,
    };

    let main_column = table
        .column(main)
        .ok_or_else(|| mismatch(format!("no '{}' column", main)))?;
    let other_column = table
        .column(other)
        .ok_or_else(|| mismatch(format!("no '{}' column", other)))?;

    if main_column.len() != other_column.len() || main_column.len() != table.labels.len() {
        return Err(mismatch(format!(
            "row counts differ ({} labels, {} '{}', {} '{}')",
            table.labels.len(),
            main_column.len(),
            main,
            other_column.len(),
            other
        )));
    }

    let mut main_lines = Vec::with_capacity(main_column.len());
    let mut other_lines = Vec::with_capacity(other_column.len());
    for (i, (m, o)) in main_column.iter().zip(other_column).enumerate() {
        let (m, o) = (to_line(m), to_line(o));
        if m.is_empty() || o.is_empty() {
            let label = table.labels.get(i).map(String::as_str).unwrap_or("?");
            return Err(mismatch(format!("blank entry in row {}", label)));
        }
        main_lines.push(m);
        other_lines.push(o);
    }

    Ok(AlignedPair {
        other: other.to_string(),
        main_lines,
        other_lines,
    })
}

/// Exports stored tables as a line-aligned corpus
#[derive(Debug, Clone)]
pub struct AlignmentExporter {
    tables_dir: PathBuf,
    output_root: PathBuf,
    main_language: String,
    languages: Option<Vec<String>>,
    documents: Option<HashSet<String>>,
}

impl AlignmentExporter {
    /// Creates an exporter
    ///
    /// # Arguments
    ///
    /// * `tables_dir` - Directory of `<id>.tsv` tables
    /// * `output_root` - Directory under which `text_<main>` is written
    /// * `main_language` - Language paired with every other column
    /// * `languages` - Other languages to export; `None` exports every column
    pub fn new(
        tables_dir: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
        main_language: &str,
        languages: Option<Vec<String>>,
    ) -> Self {
        Self {
            tables_dir: tables_dir.into(),
            output_root: output_root.into(),
            main_language: main_language.to_string(),
            languages,
            documents: None,
        }
    }

    /// Restricts the export to the tables of the given document ids
    ///
    /// Any other table in the directory is stale and left out.
    pub fn with_documents<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.documents = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    fn is_exported_document(&self, path: &Path) -> bool {
        let Some(documents) = &self.documents else {
            return true;
        };
        path.file_stem()
            .and_then(|s| s.to_str())
            .map_or(false, |id| documents.contains(id))
    }

    /// Root of the exported corpus
    pub fn corpus_dir(&self) -> PathBuf {
        self.output_root.join(format!("text_{}", self.main_language))
    }

    fn pair_dir(&self, other: &str) -> PathBuf {
        self.corpus_dir()
            .join(format!("{}_{}", self.main_language, other))
    }

    fn is_requested(&self, lang: &str) -> bool {
        lang != self.main_language
            && self
                .languages
                .as_ref()
                .map_or(true, |wanted| wanted.iter().any(|l| l == lang))
    }

    /// Aligns every pair in one table, all or nothing
    fn align_table(&self, table: &StoredTable) -> Result<Vec<AlignedPair>> {
        if !table.has_language(&self.main_language) {
            return Err(HarvestError::AlignmentMismatch {
                table: table.name.clone(),
                main: self.main_language.clone(),
                other: String::new(),
                reason: format!("no '{}' column", self.main_language),
            });
        }

        if let Some(bad) = table.labels.iter().find(|l| l.parse::<RowLabel>().is_err()) {
            return Err(HarvestError::AlignmentMismatch {
                table: table.name.clone(),
                main: self.main_language.clone(),
                other: String::new(),
                reason: format!("unknown row label '{}'", bad),
            });
        }

        table
            .languages
            .iter()
            .filter(|lang| self.is_requested(lang))
            .map(|other| align_pair(table, &self.main_language, other))
            .collect()
    }

    /// Rebuilds the corpus from scratch
    ///
    /// The `text_<main>` directory is removed first so repeated exports never
    /// duplicate lines. Tables are processed in file-name order.
    pub fn export(&self) -> Result<ExportReport> {
        let corpus_dir = self.corpus_dir();
        if corpus_dir.exists() {
            fs::remove_dir_all(&corpus_dir)?;
        }
        fs::create_dir_all(&corpus_dir)?;

        let store = TableStore::new(&self.tables_dir);
        let mut report = ExportReport::default();

        for path in store.list()? {
            if !self.is_exported_document(&path) {
                tracing::debug!("Skipping stale table {}", path.display());
                report.tables_skipped += 1;
                continue;
            }
            report.tables_read += 1;
            let name = table_name(&path);

            let table = match read_table(&path) {
                Ok(table) => table,
                Err(e) => {
                    tracing::warn!("Skipping unreadable table {}: {}", path.display(), e);
                    report.rejected.push((name, e.to_string()));
                    continue;
                }
            };

            let pairs = match self.align_table(&table) {
                Ok(pairs) => pairs,
                Err(e) => {
                    tracing::warn!("{}", e);
                    report.rejected.push((name, e.to_string()));
                    continue;
                }
            };

            for pair in &pairs {
                self.append_pair(pair)?;
                *report.lines.entry(pair.other.clone()).or_insert(0) += pair.main_lines.len();
            }
            report.tables_exported += 1;
        }

        tracing::info!(
            "Exported {} of {} tables to {} ({} rejected, {} stale)",
            report.tables_exported,
            report.tables_read,
            corpus_dir.display(),
            report.rejected.len(),
            report.tables_skipped
        );
        Ok(report)
    }

    fn append_pair(&self, pair: &AlignedPair) -> Result<()> {
        let dir = self.pair_dir(&pair.other);
        fs::create_dir_all(&dir)?;

        append_lines(
            &dir.join(format!("data.{}", self.main_language)),
            &pair.main_lines,
        )?;
        append_lines(&dir.join(format!("data.{}", pair.other)), &pair.other_lines)?;
        Ok(())
    }
}

fn table_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn append_lines(path: &Path, lines: &[String]) -> Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::new(file);
    for line in lines {
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_tsv(dir: &Path, name: &str, content: &str) {
        fs::create_dir_all(dir).unwrap();
        let mut f = fs::File::create(dir.join(name)).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    fn read_lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_align_pair_flattens_newlines() {
        let dir = TempDir::new().unwrap();
        write_tsv(
            dir.path(),
            "a.tsv",
            "label\tes\tkek\nprimary-1\t\"Uno\ny dos\"\tJun\nsecondary-1\tPie\tXe\n",
        );
        let table = read_table(&dir.path().join("a.tsv")).unwrap();

        let pair = align_pair(&table, "es", "kek").unwrap();
        assert_eq!(pair.main_lines, vec!["Uno y dos", "Pie"]);
        assert_eq!(pair.other_lines, vec!["Jun", "Xe"]);
    }

    #[test]
    fn test_align_pair_rejects_blank_entry() {
        let dir = TempDir::new().unwrap();
        write_tsv(
            dir.path(),
            "a.tsv",
            "label\tes\tkek\nprimary-1\tUno\t  \n",
        );
        let table = read_table(&dir.path().join("a.tsv")).unwrap();

        match align_pair(&table, "es", "kek") {
            Err(HarvestError::AlignmentMismatch { reason, .. }) => {
                assert!(reason.contains("primary-1"))
            }
            other => panic!("expected mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_align_pair_rejects_ragged_rows() {
        let dir = TempDir::new().unwrap();
        write_tsv(
            dir.path(),
            "a.tsv",
            "label\tes\tkek\nprimary-1\tUno\tJun\nprimary-2\tDos\n",
        );
        let table = read_table(&dir.path().join("a.tsv")).unwrap();

        match align_pair(&table, "es", "kek") {
            Err(HarvestError::AlignmentMismatch { reason, .. }) => {
                assert!(reason.contains("row counts differ"))
            }
            other => panic!("expected mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_export_rejects_ragged_table() {
        let dir = TempDir::new().unwrap();
        let tables = dir.path().join("tables");
        write_tsv(&tables, "a.tsv", "label\tes\tkek\nprimary-1\tUno\tJun\n");
        write_tsv(
            &tables,
            "b.tsv",
            "label\tes\tkek\nprimary-1\tDos\tKab\nprimary-2\tTres\n",
        );

        let report = AlignmentExporter::new(&tables, dir.path(), "es", None)
            .export()
            .unwrap();

        assert_eq!(report.tables_exported, 1);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].0, "b.tsv");
        assert!(report.rejected[0].1.contains("row counts differ"));
        assert_eq!(report.lines_for("kek"), 1);

        let kek = dir.path().join("text_es/es_kek");
        assert_eq!(read_lines(&kek.join("data.es")), vec!["Uno"]);
        assert_eq!(read_lines(&kek.join("data.kek")), vec!["Jun"]);
    }

    #[test]
    fn test_export_rejects_unknown_row_label() {
        let dir = TempDir::new().unwrap();
        let tables = dir.path().join("tables");
        write_tsv(&tables, "a.tsv", "label\tes\tkek\nfootnote-1\tUno\tJun\n");

        let report = AlignmentExporter::new(&tables, dir.path(), "es", None)
            .export()
            .unwrap();
        assert_eq!(report.tables_exported, 0);
        assert!(report.rejected[0].1.contains("footnote-1"));
    }

    #[test]
    fn test_export_limited_to_listed_documents() {
        let dir = TempDir::new().unwrap();
        let tables = dir.path().join("tables");
        write_tsv(&tables, "doc-1.tsv", "label\tes\tkek\nprimary-1\tUno\tJun\n");
        write_tsv(&tables, "old-1.tsv", "label\tes\tkek\nprimary-1\tUno\tJun\n");

        let report = AlignmentExporter::new(&tables, dir.path(), "es", None)
            .with_documents(["doc-1"])
            .export()
            .unwrap();

        assert_eq!(report.tables_read, 1);
        assert_eq!(report.tables_skipped, 1);
        assert_eq!(report.lines_for("kek"), 1);
        assert_eq!(
            read_lines(&dir.path().join("text_es/es_kek/data.kek")),
            vec!["Jun"]
        );
    }

    #[test]
    fn test_export_skips_bad_tables_and_keeps_symmetry() {
        let dir = TempDir::new().unwrap();
        let tables = dir.path().join("tables");
        write_tsv(&tables, "a.tsv", "label\tes\tkek\tmam\nprimary-1\tUno\tJun\tJuun\n");
        // Blank kek cell: the whole table is dropped, mam included
        write_tsv(&tables, "b.tsv", "label\tes\tkek\tmam\nprimary-1\tDos\t\tKab\n");
        write_tsv(&tables, "c.tsv", "label\tes\tkek\nprimary-1\tTres\tOxib\n");

        let exporter = AlignmentExporter::new(&tables, dir.path(), "es", None);
        let report = exporter.export().unwrap();

        assert_eq!(report.tables_read, 3);
        assert_eq!(report.tables_exported, 2);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].0, "b.tsv");
        assert_eq!(report.lines_for("kek"), 2);
        assert_eq!(report.lines_for("mam"), 1);

        let kek = dir.path().join("text_es/es_kek");
        assert_eq!(read_lines(&kek.join("data.es")), vec!["Uno", "Tres"]);
        assert_eq!(read_lines(&kek.join("data.kek")), vec!["Jun", "Oxib"]);

        let mam = dir.path().join("text_es/es_mam");
        assert_eq!(read_lines(&mam.join("data.es")).len(), read_lines(&mam.join("data.mam")).len());
    }

    #[test]
    fn test_export_is_repeatable_and_filters_languages() {
        let dir = TempDir::new().unwrap();
        let tables = dir.path().join("tables");
        write_tsv(&tables, "a.tsv", "label\tes\tkek\tmam\nprimary-1\tUno\tJun\tJuun\n");

        let exporter =
            AlignmentExporter::new(&tables, dir.path(), "es", Some(vec!["kek".to_string()]));
        exporter.export().unwrap();
        let report = exporter.export().unwrap();

        assert_eq!(report.lines_for("kek"), 1);
        assert_eq!(
            read_lines(&dir.path().join("text_es/es_kek/data.kek")),
            vec!["Jun"]
        );
        assert!(!dir.path().join("text_es/es_mam").exists());
    }

    #[test]
    fn test_table_without_main_column_is_rejected() {
        let dir = TempDir::new().unwrap();
        let tables = dir.path().join("tables");
        write_tsv(&tables, "a.tsv", "label\tkek\tmam\nprimary-1\tJun\tJuun\n");

        let report = AlignmentExporter::new(&tables, dir.path(), "es", None)
            .export()
            .unwrap();
        assert_eq!(report.tables_exported, 0);
        assert_eq!(report.rejected.len(), 1);
    }
}
