//! Text rendering of the active record and the document list.

use crate::models::{AnalysisRecord, DocumentDescriptor};

/// One labelled figure of the summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatCard {
    pub title: &'static str,
    pub value: String,
}

impl StatCard {
    fn new(title: &'static str, value: impl Into<String>) -> Self {
        Self {
            title,
            value: value.into(),
        }
    }
}

fn or_dash(value: &str) -> &str {
    if value.trim().is_empty() {
        "-"
    } else {
        value
    }
}

/// Summary cards for a record, in display order.
pub fn stat_cards(record: &AnalysisRecord) -> Vec<StatCard> {
    let top_book = if record.most_borrowed_book.trim().is_empty() {
        "-".to_string()
    } else {
        format!(
            "{} ({} borrows)",
            record.most_borrowed_book, record.most_borrowed_book_count
        )
    };

    vec![
        StatCard::new("Reader", or_dash(&record.reader_name)),
        StatCard::new("Borrows", format!("{}", record.borrow_frequency)),
        StatCard::new(
            "Reading time",
            format!("{} days", record.total_reading_duration),
        ),
        StatCard::new("Total value", format!("{:.2}", record.total_price)),
        StatCard::new("Top author", or_dash(&record.most_frequent_author)),
        StatCard::new("Top category", record.top_category().unwrap_or("-")),
        StatCard::new("Peak month", or_dash(&record.borrow_peak_yearmonth)),
        StatCard::new("Top book", top_book),
        StatCard::new(
            "Full-attendance months",
            format!("{}", record.total_full_attendance),
        ),
        StatCard::new("Longest-read author", or_dash(&record.longest_author)),
        StatCard::new("Longest-read category", or_dash(&record.longest_category)),
    ]
}

/// Render the cards as an aligned two-column block.
pub fn render_cards(record: &AnalysisRecord) -> String {
    let cards = stat_cards(record);
    let width = cards.iter().map(|c| c.title.len()).max().unwrap_or(0);

    let mut output = String::new();
    for card in &cards {
        output.push_str(&format!("   {:<width$}  {}\n", card.title, card.value, width = width));
    }

    if !record.full_attendance_months.is_empty() {
        output.push_str(&format!(
            "   {:<width$}  {}\n",
            "",
            record.full_attendance_months.join(", "),
            width = width
        ));
    }

    output
}

/// Render the document list, marking the active document.
pub fn render_documents(documents: &[DocumentDescriptor], active: Option<usize>) -> String {
    let mut output = String::new();

    for doc in documents {
        let marker = if Some(doc.index) == active { "*" } else { " " };
        output.push_str(&format!("  {} {}\n", marker, doc));
    }

    output
}
