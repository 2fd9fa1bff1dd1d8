use crate::document::ExtractedTable;

/// Outcome of validating an extracted table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub valid: bool,
    /// Human-readable explanation, never empty
    pub reason: String,
}

impl Validation {
    fn accept(reason: String) -> Self {
        Self {
            valid: true,
            reason,
        }
    }

    fn reject(reason: String) -> Self {
        Self {
            valid: false,
            reason,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

/// Validates a document table against the languages the document declared
///
/// A table is accepted only if it has at least one row and one column, has a
/// column for every declared language, and has no missing cells.
pub fn validate(table: &ExtractedTable, languages: &[String]) -> Validation {
    if table.is_empty() {
        return Validation::reject(format!(
            "table is empty ({} rows, {} languages)",
            table.row_count(),
            table.languages().len()
        ));
    }

    let absent: Vec<&str> = languages
        .iter()
        .filter(|lang| !table.has_language(lang))
        .map(String::as_str)
        .collect();
    if !absent.is_empty() {
        return Validation::reject(format!(
            "missing language columns: {}",
            absent.join(", ")
        ));
    }

    let missing = table.missing_cells();
    if !missing.is_empty() {
        let sample: Vec<String> = missing
            .iter()
            .take(5)
            .map(|(label, lang)| format!("{}/{}", label, lang))
            .collect();
        return Validation::reject(format!(
            "{} missing cells (first: {})",
            missing.len(),
            sample.join(", ")
        ));
    }

    Validation::accept(format!(
        "{} rows x {} languages",
        table.row_count(),
        table.languages().len()
    ))
}
