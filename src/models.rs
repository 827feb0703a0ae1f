//! Data models for the analysis session.
//!
//! This module contains the records exchanged with the analysis engine and
//! the chart-ready series derived from them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Spreadsheet extensions accepted by the pickers.
pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xls"];

/// Paths chosen by the user for one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSelection {
    /// Borrow-record workbooks, in the order they were picked.
    pub borrow_files: Vec<PathBuf>,
    /// Reader (member) list workbook.
    pub member_file: Option<PathBuf>,
}

impl InputSelection {
    #[cfg(test)]
    pub fn new(borrow_files: Vec<PathBuf>, member_file: Option<PathBuf>) -> Self {
        Self {
            borrow_files,
            member_file,
        }
    }

    /// Returns a description of what is missing, or `None` if the selection can be analyzed.
    pub fn missing_input(&self) -> Option<&'static str> {
        if self.borrow_files.is_empty() {
            Some("select at least one borrow-record file")
        } else if self.member_file.is_none() {
            Some("select the reader list file")
        } else {
            None
        }
    }
}

/// One reader's document as isolated by the engine's load step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDescriptor {
    /// Position in the engine's return order.
    pub index: usize,
    /// Name of the reader the document mostly belongs to.
    pub primary_name: String,
    /// Number of borrow records attributed to the document.
    pub record_count: usize,
    /// Workbook the document came from, when the engine reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,
}

impl fmt::Display for DocumentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({} records)",
            self.index, self.primary_name, self.record_count
        )
    }
}

/// Per-document statistics returned by the engine.
///
/// Records are immutable once received. Re-analysis replaces the whole
/// record, so the session shares them behind an `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    #[serde(default)]
    pub reader_name: String,
    pub borrow_frequency: u32,
    /// Total reading duration in days.
    #[serde(default)]
    pub total_reading_duration: u32,
    #[serde(default)]
    pub total_price: f64,
    #[serde(default)]
    pub most_frequent_author: String,
    #[serde(default)]
    pub most_frequent_category: Option<String>,
    #[serde(default)]
    pub longest_author: String,
    #[serde(default)]
    pub longest_category: String,
    /// Year-month label of the busiest period.
    #[serde(default)]
    pub borrow_peak_yearmonth: String,
    #[serde(default)]
    pub most_borrowed_book: String,
    #[serde(default)]
    pub most_borrowed_book_count: u32,
    #[serde(default)]
    pub total_full_attendance: u32,
    /// Borrow counts keyed by year-month label, in engine order.
    #[serde(default, rename = "monthly_borrow")]
    pub monthly_borrow_counts: IndexMap<String, u32>,
    /// Borrow counts keyed by book title, in engine order.
    #[serde(default)]
    pub book_borrow_counts: IndexMap<String, u32>,
    #[serde(default, rename = "full_attendance")]
    pub full_attendance_months: Vec<String>,
}

impl AnalysisRecord {
    /// The most frequent category, treating an empty label as absent.
    pub fn top_category(&self) -> Option<&str> {
        self.most_frequent_category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// Chart-ready aggregates derived from one `AnalysisRecord`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedSeries {
    /// At most ten `(title, count)` pairs, highest count first.
    pub top_books: Vec<(String, u32)>,
    /// `(period, count)` pairs in chronological order.
    pub monthly_trend: Vec<(String, u32)>,
    /// Estimated borrow counts per category. Placeholder figures, see
    /// [`crate::analysis::category_split`].
    pub category_split: IndexMap<String, u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_completeness() {
        let mut selection = InputSelection::default();
        assert_eq!(
            selection.missing_input(),
            Some("select at least one borrow-record file")
        );

        selection.borrow_files.push(PathBuf::from("borrow.xlsx"));
        assert_eq!(selection.missing_input(), Some("select the reader list file"));

        selection.member_file = Some(PathBuf::from("readers.xlsx"));
        assert_eq!(selection.missing_input(), None);
    }

    #[test]
    fn test_record_parses_engine_payload() {
        let payload = r#"{
            "reader_name": "Li Wei",
            "borrow_frequency": 12,
            "total_reading_duration": 88,
            "total_price": 301.5,
            "most_frequent_author": "Yu Hua",
            "most_frequent_category": "Fiction",
            "longest_author": "Yu Hua",
            "longest_category": "Fiction",
            "borrow_peak_yearmonth": "2024-03",
            "most_borrowed_book": "To Live",
            "most_borrowed_book_count": 3,
            "total_full_attendance": 2,
            "monthly_borrow": {"2024-03": 5, "2024-01": 7},
            "book_borrow_counts": {"To Live": 3, "Brothers": 1},
            "full_attendance": ["2024-01", "2024-03"]
        }"#;

        let record: AnalysisRecord = serde_json::from_str(payload).unwrap();
        assert_eq!(record.reader_name, "Li Wei");
        assert_eq!(record.top_category(), Some("Fiction"));
        let months: Vec<_> = record.monthly_borrow_counts.keys().cloned().collect();
        assert_eq!(months, vec!["2024-03", "2024-01"]);
        assert_eq!(record.full_attendance_months.len(), 2);
    }

    #[test]
    fn test_blank_category_is_absent() {
        let record = AnalysisRecord {
            most_frequent_category: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(record.top_category(), None);
    }

    #[test]
    fn test_document_display() {
        let doc = DocumentDescriptor {
            index: 2,
            primary_name: "Zhang San".to_string(),
            record_count: 40,
            source_path: None,
        };
        assert_eq!(doc.to_string(), "[2] Zhang San (40 records)");
    }
}
