//! Markdown summary generation
//!
//! Writes a human-readable coverage report: overall progress, documents and
//! scraped documents per language, and lines exported per language pair.

use crate::output::aligner::ExportReport;
use crate::output::stats::{format_epoch, RunTotals};
use crate::state::Registry;
use crate::Result;
use std::collections::BTreeMap;
use std::path::Path;

/// Documents offering a language, and how many of those are scraped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LanguageCoverage {
    pub documents: usize,
    pub scraped: usize,
}

/// Counts coverage per language across the registry
pub fn language_coverage(registry: &Registry) -> BTreeMap<String, LanguageCoverage> {
    let mut coverage: BTreeMap<String, LanguageCoverage> = BTreeMap::new();
    for record in registry.iter() {
        for lang in &record.languages {
            let entry = coverage.entry(lang.clone()).or_default();
            entry.documents += 1;
            if record.is_scraped {
                entry.scraped += 1;
            }
        }
    }
    coverage
}

/// Formats the coverage report as markdown
pub fn format_markdown_summary(
    totals: &RunTotals,
    registry: &Registry,
    main_language: &str,
    export: Option<&ExportReport>,
) -> String {
    let mut md = String::new();

    md.push_str("# Parallel-Harvest Summary\n\n");

    md.push_str("## Progress\n\n");
    md.push_str(&format!(
        "- **URLs visited**: {} of {} ({:.1}%)\n",
        totals.urls_visited,
        totals.urls_total,
        totals.visited_rate()
    ));
    md.push_str(&format!(
        "- **Documents confirmed**: {}\n",
        totals.documents_confirmed
    ));
    md.push_str(&format!("- **Documents scraped**: {}\n", totals.documents_scraped));
    md.push_str(&format!("- **Documents pending**: {}\n", totals.documents_pending));
    if let Some(started) = totals.started_at {
        md.push_str(&format!("- **First started**: {}\n", format_epoch(started)));
    }
    if let Some(saved) = totals.last_saved {
        md.push_str(&format!("- **Last saved**: {}\n", format_epoch(saved)));
    }
    md.push('\n');

    let coverage = language_coverage(registry);
    if !coverage.is_empty() {
        md.push_str("## Language Coverage\n\n");
        md.push_str("| Language | Documents | Scraped |\n");
        md.push_str("|----------|-----------|---------|\n");
        for (lang, c) in &coverage {
            let name = if lang == main_language {
                format!("{} (main)", lang)
            } else {
                lang.clone()
            };
            md.push_str(&format!("| {} | {} | {} |\n", name, c.documents, c.scraped));
        }
        md.push('\n');
    }

    if let Some(export) = export {
        md.push_str("## Exported Corpus\n\n");
        md.push_str(&format!(
            "- **Tables exported**: {} of {}\n\n",
            export.tables_exported, export.tables_read
        ));

        if !export.lines.is_empty() {
            md.push_str("| Pair | Lines |\n");
            md.push_str("|------|-------|\n");
            for (other, lines) in &export.lines {
                md.push_str(&format!("| {}_{} | {} |\n", main_language, other, lines));
            }
            md.push('\n');
        }

        if !export.rejected.is_empty() {
            md.push_str("### Rejected Tables\n\n");
            for (name, reason) in &export.rejected {
                md.push_str(&format!("- `{}`: {}\n", name, reason));
            }
            md.push('\n');
        }
    }

    md
}

/// Writes the markdown summary to `output_path`
pub fn generate_markdown_summary(
    totals: &RunTotals,
    registry: &Registry,
    main_language: &str,
    export: Option<&ExportReport>,
    output_path: &Path,
) -> Result<()> {
    let markdown = format_markdown_summary(totals, registry, main_language, export);
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(output_path, markdown)?;
    Ok(())
}
