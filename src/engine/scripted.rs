//! In-memory engine for orchestration tests.
//!
//! Responses can be held back behind oneshot gates so tests decide the
//! order in which concurrent calls complete.

use super::AnalysisService;
use crate::error::{EngineError, EngineResult};
use crate::models::{AnalysisRecord, DocumentDescriptor};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::oneshot;

#[derive(Default)]
pub struct ScriptedEngine {
    pub documents: Vec<DocumentDescriptor>,
    pub records: HashMap<usize, AnalysisRecord>,
    pub load_error: Option<String>,
    pub analyze_errors: HashMap<usize, String>,
    /// Calls that never complete.
    pub hang_on_analyze: bool,
    load_gate: RefCell<Option<oneshot::Receiver<()>>>,
    analyze_gates: RefCell<HashMap<usize, oneshot::Receiver<()>>>,
    calls: RefCell<Vec<String>>,
    /// Document of the last completed `analyze_by_index`, which reports describe.
    current: Cell<Option<usize>>,
}

impl ScriptedEngine {
    /// Engine with `names.len()` documents, each analyzable.
    pub fn with_readers(names: &[&str]) -> Self {
        let documents = names
            .iter()
            .enumerate()
            .map(|(index, name)| DocumentDescriptor {
                index,
                primary_name: name.to_string(),
                record_count: 10 + index,
                source_path: None,
            })
            .collect();

        let records = names
            .iter()
            .enumerate()
            .map(|(index, name)| (index, record_for(name, 10 * (index as u32 + 1))))
            .collect();

        Self {
            documents,
            records,
            ..Default::default()
        }
    }

    /// Hold the load step until the returned sender fires.
    pub fn gate_load(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.load_gate.borrow_mut() = Some(rx);
        tx
    }

    /// Hold `analyze_by_index(index)` until the returned sender fires.
    pub fn gate_analyze(&self, index: usize) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.analyze_gates.borrow_mut().insert(index, rx);
        tx
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record_call(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

pub fn record_for(name: &str, frequency: u32) -> AnalysisRecord {
    AnalysisRecord {
        reader_name: name.to_string(),
        borrow_frequency: frequency,
        total_reading_duration: frequency * 7,
        total_price: f64::from(frequency) * 12.5,
        most_frequent_category: Some("Fiction".to_string()),
        most_borrowed_book: format!("{}'s favourite", name),
        most_borrowed_book_count: 2,
        book_borrow_counts: [("A".to_string(), 3), ("B".to_string(), 5)]
            .into_iter()
            .collect(),
        monthly_borrow_counts: [("2024-02".to_string(), 4), ("2024-01".to_string(), 6)]
            .into_iter()
            .collect(),
        ..Default::default()
    }
}

impl AnalysisService for ScriptedEngine {
    async fn load_documents(
        &self,
        reader_list_path: &Path,
        borrow_paths: &[PathBuf],
    ) -> EngineResult<Vec<DocumentDescriptor>> {
        self.record_call(format!(
            "load_documents({}, {})",
            reader_list_path.display(),
            borrow_paths.len()
        ));

        let gate = self.load_gate.borrow_mut().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        match &self.load_error {
            Some(message) => Err(EngineError::Remote(message.clone())),
            None => Ok(self.documents.clone()),
        }
    }

    async fn analyze_by_index(&self, index: usize) -> EngineResult<AnalysisRecord> {
        self.record_call(format!("analyze_by_index({})", index));

        if self.hang_on_analyze {
            std::future::pending::<()>().await;
        }

        let gate = self.analyze_gates.borrow_mut().remove(&index);
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        if let Some(message) = self.analyze_errors.get(&index) {
            return Err(EngineError::Remote(message.clone()));
        }

        let record = self
            .records
            .get(&index)
            .cloned()
            .ok_or_else(|| EngineError::Remote(format!("no document at index {}", index)))?;
        self.current.set(Some(index));
        Ok(record)
    }

    async fn get_document_count(&self) -> EngineResult<usize> {
        self.record_call("get_document_count".to_string());
        Ok(self.documents.len())
    }

    async fn get_document_name(&self, index: usize) -> EngineResult<String> {
        self.record_call(format!("get_document_name({})", index));
        self.documents
            .get(index)
            .map(|d| d.primary_name.clone())
            .ok_or_else(|| EngineError::Remote(format!("no document at index {}", index)))
    }

    async fn export_report(&self, output_path: &Path) -> EngineResult<()> {
        let Some(current) = self.current.get() else {
            return Err(EngineError::Remote("no document analyzed".to_string()));
        };
        self.record_call(format!(
            "export_report({}) of doc {}",
            output_path.display(),
            current
        ));
        Ok(())
    }

    async fn export_all_reports(&self, base_output_dir: &Path) -> EngineResult<Vec<PathBuf>> {
        self.record_call(format!("export_all_reports({})", base_output_dir.display()));
        Ok(self
            .documents
            .iter()
            .map(|d| base_output_dir.join(format!("{}_report.html", d.primary_name)))
            .collect())
    }
}
