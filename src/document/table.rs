//! Multi-language paragraph tables
//!
//! Each language variant of a document yields two ordered groups of text
//! segments. Rows are labelled by group and 1-based position, so the table for a
//! document lines up the n-th primary paragraph of every language even when a
//! language is missing some of its segments.

use crate::driver::TextSegments;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Position class of a text segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SegmentGroup {
    Primary,
    Secondary,
}

impl SegmentGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

/// Synthetic row label, e.g. `primary-3`
///
/// Ordering puts every primary row before every secondary row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowLabel {
    pub group: SegmentGroup,
    pub index: usize,
}

impl RowLabel {
    pub fn primary(index: usize) -> Self {
        Self {
            group: SegmentGroup::Primary,
            index,
        }
    }

    pub fn secondary(index: usize) -> Self {
        Self {
            group: SegmentGroup::Secondary,
            index,
        }
    }
}

impl fmt::Display for RowLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.group.as_str(), self.index)
    }
}

impl FromStr for RowLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (group, index) = s
            .rsplit_once('-')
            .ok_or_else(|| format!("row label '{}' has no index", s))?;
        let index: usize = index
            .parse()
            .map_err(|_| format!("row label '{}' has a non-numeric index", s))?;
        if index == 0 {
            return Err(format!("row label '{}' must be 1-indexed", s));
        }
        match group {
            "primary" => Ok(Self::primary(index)),
            "secondary" => Ok(Self::secondary(index)),
            other => Err(format!("unknown segment group '{}'", other)),
        }
    }
}

/// One language's extracted text keyed by row label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageColumn {
    pub lang: String,
    cells: BTreeMap<RowLabel, String>,
}

impl LanguageColumn {
    /// Builds the column for a rendered language variant
    pub fn from_segments(lang: &str, segments: &TextSegments) -> Self {
        let primary = segments
            .primary
            .iter()
            .enumerate()
            .map(|(i, text)| (RowLabel::primary(i + 1), text.clone()));
        let secondary = segments
            .secondary
            .iter()
            .enumerate()
            .map(|(i, text)| (RowLabel::secondary(i + 1), text.clone()));

        Self {
            lang: lang.to_string(),
            cells: primary.chain(secondary).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Paragraph table for one document: rows are labels, columns are languages
///
/// Construction never fails; a language lacking a label simply leaves a missing
/// cell. Whether the result is usable is decided by [`crate::document::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractedTable {
    labels: Vec<RowLabel>,
    languages: Vec<String>,
    /// Row-major cells, `rows[row][col]`
    rows: Vec<Vec<Option<String>>>,
}

impl ExtractedTable {
    /// Aligns language columns on their row labels
    ///
    /// Columns keep the order in which they are given. A repeated language
    /// replaces the earlier column.
    pub fn assemble(columns: Vec<LanguageColumn>) -> Self {
        let mut by_lang: Vec<LanguageColumn> = Vec::with_capacity(columns.len());
        for column in columns {
            match by_lang.iter_mut().find(|c| c.lang == column.lang) {
                Some(existing) => *existing = column,
                None => by_lang.push(column),
            }
        }

        let labels: Vec<RowLabel> = by_lang
            .iter()
            .flat_map(|c| c.cells.keys().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let rows = labels
            .iter()
            .map(|label| {
                by_lang
                    .iter()
                    .map(|column| column.cells.get(label).cloned())
                    .collect()
            })
            .collect();

        Self {
            labels,
            languages: by_lang.into_iter().map(|c| c.lang).collect(),
            rows,
        }
    }

    /// Row labels in table order
    pub fn labels(&self) -> &[RowLabel] {
        &self.labels
    }

    /// Column languages in table order
    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    pub fn row_count(&self) -> usize {
        self.labels.len()
    }

    /// True if the table has no rows or no columns
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty() || self.languages.is_empty()
    }

    pub fn has_language(&self, lang: &str) -> bool {
        self.languages.iter().any(|l| l == lang)
    }

    /// Cell at a row and column index
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .and_then(|c| c.as_deref())
    }

    /// All cells of a language, `None` where the language lacks a row
    pub fn column(&self, lang: &str) -> Option<Vec<Option<&str>>> {
        let col = self.languages.iter().position(|l| l == lang)?;
        Some(self.rows.iter().map(|r| r[col].as_deref()).collect())
    }

    /// Every (row label, language) pair without a value
    pub fn missing_cells(&self) -> Vec<(RowLabel, &str)> {
        let mut missing = Vec::new();
        for (label, row) in self.labels.iter().zip(&self.rows) {
            for (lang, cell) in self.languages.iter().zip(row) {
                if cell.is_none() {
                    missing.push((*label, lang.as_str()));
                }
            }
        }
        missing
    }
}
