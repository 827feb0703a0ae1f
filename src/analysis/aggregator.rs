//! Chart-ready aggregation of analysis records.
//!
//! Everything here is a pure function of one `AnalysisRecord`; derived
//! series are recomputed on every render and never cached.

use crate::models::{AnalysisRecord, DerivedSeries};
use indexmap::IndexMap;

/// Number of books shown in the ranking chart.
pub const TOP_BOOKS_LIMIT: usize = 10;

/// Bucket receiving the remainder of the category estimate.
pub const OTHER_CATEGORY: &str = "Other";

/// Share of the borrow frequency attributed to the top category.
const TOP_CATEGORY_SHARE: f64 = 0.4;

/// Share of the borrow frequency attributed to the "Other" bucket.
const OTHER_CATEGORY_SHARE: f64 = 0.6;

/// Derive every chart series from a record.
pub fn derive_series(record: &AnalysisRecord) -> DerivedSeries {
    DerivedSeries {
        top_books: top_books(&record.book_borrow_counts, TOP_BOOKS_LIMIT),
        monthly_trend: monthly_trend(&record.monthly_borrow_counts),
        category_split: category_split(record),
    }
}

/// Rank books by borrow count, highest first.
///
/// The sort is stable, so books with equal counts keep the engine's order.
pub fn top_books(counts: &IndexMap<String, u32>, n: usize) -> Vec<(String, u32)> {
    let mut ranked: Vec<(String, u32)> = counts
        .iter()
        .map(|(title, count)| (title.clone(), *count))
        .collect();

    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(n);
    ranked
}

/// Order monthly counts by period label.
///
/// Labels are fixed-width `YYYY-MM` tokens, so string order is chronological.
pub fn monthly_trend(counts: &IndexMap<String, u32>) -> Vec<(String, u32)> {
    let mut trend: Vec<(String, u32)> = counts
        .iter()
        .map(|(period, count)| (period.clone(), *count))
        .collect();

    trend.sort_by(|a, b| a.0.cmp(&b.0));
    trend
}

/// Estimate the category distribution.
///
/// PLACEHOLDER: the engine only reports the single most frequent category,
/// so this is not a measured breakdown. The top category gets 40% of the
/// borrow frequency and "Other" gets 60%, each floored.
pub fn category_split(record: &AnalysisRecord) -> IndexMap<String, u32> {
    let mut split = IndexMap::new();

    let Some(category) = record.top_category() else {
        return split;
    };

    let frequency = f64::from(record.borrow_frequency);
    let top = (frequency * TOP_CATEGORY_SHARE).floor() as u32;
    let other = (frequency * OTHER_CATEGORY_SHARE).floor() as u32;

    *split.entry(category.to_string()).or_insert(0) += top;
    *split.entry(OTHER_CATEGORY.to_string()).or_insert(0) += other;

    split
}
