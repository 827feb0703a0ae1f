//! Presentation of the session: charts and stat cards.
//!
//! `ViewController` listens to session events and keeps the chart slots in
//! step with the active record.

pub mod cards;

pub use cards::{render_cards, render_documents};

use crate::analysis::derive_series;
use crate::charts::{
    ChartBackend, ChartData, ChartKind, ChartRegistry, BOOK_BORROW_SLOT, CATEGORY_SPLIT_SLOT,
    MONTHLY_TREND_SLOT,
};
use crate::export;
use crate::models::{AnalysisRecord, DerivedSeries};
use crate::session::{SessionEvent, SessionListener};
use anyhow::Result;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Slot, chart kind and data for each chart of a derived series.
fn chart_plan(series: &DerivedSeries) -> [(&'static str, ChartKind, ChartData); 3] {
    [
        (
            BOOK_BORROW_SLOT,
            ChartKind::Bar,
            ChartData::from_pairs(&series.top_books),
        ),
        (
            MONTHLY_TREND_SLOT,
            ChartKind::Line,
            ChartData::from_pairs(&series.monthly_trend),
        ),
        (
            CATEGORY_SPLIT_SLOT,
            ChartKind::Pie,
            ChartData::from_map(&series.category_split),
        ),
    ]
}

pub struct ViewController<B: ChartBackend> {
    charts: RefCell<ChartRegistry<B>>,
    series: RefCell<Option<DerivedSeries>>,
}

impl<B: ChartBackend> ViewController<B> {
    pub fn new(charts: ChartRegistry<B>) -> Self {
        Self {
            charts: RefCell::new(charts),
            series: RefCell::new(None),
        }
    }

    /// Replace every chart with the series of `record`.
    pub fn show_record(&self, record: &AnalysisRecord) {
        let series = derive_series(record);
        let mut charts = self.charts.borrow_mut();
        charts.destroy_all();

        for (slot, kind, data) in chart_plan(&series) {
            if data.is_empty() {
                debug!("No data for chart '{}'", slot);
                continue;
            }
            if let Err(e) = charts.create_or_replace(slot, kind, &data) {
                warn!("Failed to draw chart '{}': {}", slot, e);
            }
        }

        *self.series.borrow_mut() = Some(series);
    }

    /// Drop every chart and the current series.
    pub fn clear(&self) {
        self.charts.borrow_mut().destroy_all();
        *self.series.borrow_mut() = None;
    }

    pub fn series(&self) -> Option<DerivedSeries> {
        self.series.borrow().clone()
    }

    pub fn live_slots(&self) -> Vec<String> {
        self.charts.borrow().live_slots()
    }

    /// Write the live charts as PNG images into `dir`.
    pub fn export_charts(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        export::write_chart_images(&self.charts.borrow(), dir)
    }
}

impl<B: ChartBackend> SessionListener for ViewController<B> {
    fn on_event(&self, event: &SessionEvent) {
        match event {
            SessionEvent::DocumentsLoaded { count } => {
                debug!("{} documents loaded, clearing charts", count);
                self.clear();
            }
            SessionEvent::ActiveRecordChanged { index, record } => {
                debug!("Drawing charts for document {}", index);
                self.show_record(record);
            }
            SessionEvent::ReportsExported { paths } => {
                for path in paths {
                    debug!("Report available at {}", path.display());
                }
            }
            _ => {}
        }
    }
}
