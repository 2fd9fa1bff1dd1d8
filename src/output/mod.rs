//! Output module for the exported corpus and run reports
//!
//! This module handles:
//! - Exporting stored tables as a line-aligned parallel corpus
//! - Computing and printing run totals
//! - Generating a markdown coverage summary

pub mod aligner;
mod markdown;
pub mod stats;

pub use aligner::{align_pair, AlignedPair, AlignmentExporter, ExportReport};
pub use markdown::{format_markdown_summary, generate_markdown_summary, language_coverage, LanguageCoverage};
pub use stats::{print_totals, RunTotals};

use crate::config::Config;
use crate::state::Registry;
use crate::storage::{if_present, Workspace};
use crate::Result;

/// Exports the corpus for a configured run
///
/// Uses `languages.export` as the language filter; an empty list exports every
/// language column found. Only tables of documents the registry marks as
/// scraped are exported; without a registry every table is.
pub fn export_corpus(workspace: &Workspace, config: &Config) -> Result<ExportReport> {
    let languages = if config.languages.export.is_empty() {
        None
    } else {
        Some(config.languages.export.clone())
    };

    let exporter = AlignmentExporter::new(
        workspace.tables_dir(),
        workspace.root(),
        &config.languages.main,
        languages,
    );

    match if_present(Registry::load(&workspace.registry_path()))? {
        Some(registry) => exporter.with_documents(registry.scraped_ids()).export(),
        None => {
            tracing::warn!(
                "No registry found; exporting every table in {}",
                workspace.tables_dir().display()
            );
            exporter.export()
        }
    }
}
