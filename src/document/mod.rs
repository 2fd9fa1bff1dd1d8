//! Document extraction model
//!
//! This module contains the per-document paragraph table built during the
//! scrape phase and the validation that decides whether a document counts as
//! scraped.

mod table;
mod validation;

pub use table::{ExtractedTable, LanguageColumn, RowLabel, SegmentGroup};
pub use validation::{validate, Validation};
