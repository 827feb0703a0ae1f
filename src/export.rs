//! Writing session artifacts: the record dump and chart images.

use crate::charts::{ChartBackend, ChartRegistry};
use crate::models::AnalysisRecord;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Replace characters that are not allowed in file names.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if cleaned.is_empty() {
        "reader".to_string()
    } else {
        cleaned
    }
}

/// `<reader>_<YYYY-MM-DD>.json`
pub fn dump_file_name(reader_name: &str, date: NaiveDate) -> String {
    format!(
        "{}_{}.json",
        sanitize_file_name(reader_name),
        date.format("%Y-%m-%d")
    )
}

pub fn ensure_output_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))
}

/// Write the record as pretty JSON into `dir`.
pub fn write_session_dump(record: &AnalysisRecord, dir: &Path, date: NaiveDate) -> Result<PathBuf> {
    ensure_output_dir(dir)?;
    let path = dir.join(dump_file_name(&record.reader_name, date));

    let content = serde_json::to_string_pretty(record).context("Failed to serialize record")?;
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write session dump to {}", path.display()))?;

    info!("Session data written to {}", path.display());
    Ok(path)
}

/// Write every live chart as `<slot>.png` into `dir`.
pub fn write_chart_images<B: ChartBackend>(
    charts: &ChartRegistry<B>,
    dir: &Path,
) -> Result<Vec<PathBuf>> {
    ensure_output_dir(dir)?;

    let mut written = Vec::new();
    for slot in charts.live_slots() {
        let bytes = charts
            .export(&slot)
            .with_context(|| format!("Failed to export chart '{}'", slot))?;
        let path = dir.join(format!("{}.png", slot));
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write chart to {}", path.display()))?;
        debug!("Chart '{}' written to {}", slot, path.display());
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::{ChartData, ChartKind, RasterBackend};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    #[test]
    fn test_dump_file_name() {
        assert_eq!(dump_file_name("Li Wei", date()), "Li Wei_2024-05-17.json");
        assert_eq!(dump_file_name("a/b:c", date()), "a_b_c_2024-05-17.json");
        assert_eq!(dump_file_name("  ", date()), "reader_2024-05-17.json");
    }

    #[test]
    fn test_write_session_dump() {
        let dir = tempfile::tempdir().unwrap();
        let record = AnalysisRecord {
            reader_name: "Ana".to_string(),
            borrow_frequency: 7,
            ..Default::default()
        };

        let path = write_session_dump(&record, &dir.path().join("out"), date()).unwrap();
        assert_eq!(path.file_name().unwrap(), "Ana_2024-05-17.json");

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\n  \"borrow_frequency\": 7"));
        let parsed: AnalysisRecord = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_write_chart_images() {
        let dir = tempfile::tempdir().unwrap();
        let mut charts = ChartRegistry::new(RasterBackend, 40, 30);
        let data = ChartData::from_pairs(&[("A".to_string(), 1)]);
        charts.create_or_replace("book-borrow", ChartKind::Bar, &data).unwrap();
        charts.create_or_replace("monthly-trend", ChartKind::Line, &data).unwrap();

        let written = write_chart_images(&charts, dir.path()).unwrap();
        assert_eq!(
            written,
            vec![
                dir.path().join("book-borrow.png"),
                dir.path().join("monthly-trend.png")
            ]
        );
        let bytes = std::fs::read(&written[0]).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }
}
