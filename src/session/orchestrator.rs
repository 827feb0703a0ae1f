//! Sequencing of engine calls, session updates and progress reporting.
//!
//! All operations run on one thread and take `&self`, so several of them
//! may be awaited concurrently. The store is only borrowed between engine
//! calls, never across an `.await`.

use super::events::{Listeners, SessionEvent, SessionListener, SubscriptionId};
use super::progress::PhasePlan;
use super::store::{RequestToken, SessionStore};
use crate::engine::AnalysisService;
use crate::error::{EngineResult, SessionError, SessionResult};
use crate::models::{AnalysisRecord, DocumentDescriptor, InputSelection};
use crate::picker::{OpenFilesOptions, Picked, PickerService};
use std::cell::RefCell;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// How a document switch ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SwitchOutcome {
    /// The record was committed and the document is now active.
    Committed(Arc<AnalysisRecord>),
    /// A newer request was issued while this one was pending; its result was dropped.
    Superseded,
    /// The document was already active with a cached record.
    AlreadyActive(Arc<AnalysisRecord>),
}

/// Clears the in-flight flag when a full analysis ends, however it ends.
struct AnalysisGuard<'a> {
    store: &'a RefCell<SessionStore>,
    token: RequestToken,
}

impl Drop for AnalysisGuard<'_> {
    fn drop(&mut self) {
        self.store.borrow_mut().end_analysis(self.token);
    }
}

/// Keeps a document switch counted as pending until it returns.
struct SwitchGuard<'a> {
    store: &'a RefCell<SessionStore>,
}

impl Drop for SwitchGuard<'_> {
    fn drop(&mut self) {
        self.store.borrow_mut().end_switch();
    }
}

pub struct AnalysisOrchestrator<S> {
    service: S,
    store: RefCell<SessionStore>,
    listeners: Listeners,
    timeout: Option<Duration>,
    extensions: Vec<String>,
}

impl<S: AnalysisService> AnalysisOrchestrator<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            store: RefCell::new(SessionStore::new()),
            listeners: Listeners::default(),
            timeout: None,
            extensions: crate::models::SPREADSHEET_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Abort engine calls that take longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Extensions offered when picking input workbooks.
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    #[cfg(test)]
    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn subscribe(&self, listener: Rc<dyn SessionListener>) -> SubscriptionId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn is_analyzing(&self) -> bool {
        self.store.borrow().is_analyzing()
    }

    pub fn input_selection(&self) -> InputSelection {
        self.store.borrow().input_selection().clone()
    }

    pub fn set_input_selection(&self, selection: InputSelection) -> SessionResult<()> {
        self.store.borrow_mut().set_input_selection(selection)
    }

    /// Documents found by the last successful load, in engine order.
    pub fn list_documents(&self) -> Vec<DocumentDescriptor> {
        self.store.borrow().documents().to_vec()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.store.borrow().active_index()
    }

    pub fn active_record(&self) -> SessionResult<Arc<AnalysisRecord>> {
        self.store.borrow().active_record()
    }

    #[cfg(test)]
    pub fn cached_record(&self, index: usize) -> Option<Arc<AnalysisRecord>> {
        self.store.borrow().cached_record(index)
    }

    fn emit(&self, event: SessionEvent) {
        self.listeners.emit(&event);
    }

    fn report_failure(&self, plan: &PhasePlan, err: &SessionError) {
        error!("{} failed: {}", plan.operation, err);
        self.emit(SessionEvent::Progress(plan.failed()));
        self.emit(SessionEvent::Failed {
            operation: plan.operation,
            message: err.to_string(),
        });
    }

    /// Await an engine call, bounded by the configured timeout.
    async fn engine_call<T>(&self, call: impl Future<Output = EngineResult<T>>) -> SessionResult<T> {
        match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => Ok(result?),
                Err(_) => Err(SessionError::Timeout(limit)),
            },
            None => Ok(call.await?),
        }
    }

    /// Ask the picker for borrow files and the reader list.
    ///
    /// A cancelled pick keeps the previous value of that field.
    pub async fn select_inputs<P: PickerService>(&self, picker: &P) -> SessionResult<InputSelection> {
        if self.is_analyzing() {
            return Err(SessionError::Validation(
                "the input selection cannot change while an analysis is running".to_string(),
            ));
        }

        let borrow = picker
            .open_files(OpenFilesOptions::multiple(&self.extensions))
            .await;
        let reader_list = picker
            .open_files(OpenFilesOptions::single(&self.extensions))
            .await;

        let mut selection = self.input_selection();
        if let Some(picked) = borrow {
            selection.borrow_files = picked.into_paths();
        }
        if let Some(path) = reader_list.and_then(Picked::into_first) {
            selection.member_file = Some(path);
        }

        self.set_input_selection(selection.clone())?;
        debug!(
            "Selected {} borrow files, reader list: {:?}",
            selection.borrow_files.len(),
            selection.member_file
        );
        Ok(selection)
    }

    /// Load every document from `selection` and analyze the first one.
    pub async fn run_full_analysis(
        &self,
        selection: &InputSelection,
    ) -> SessionResult<Arc<AnalysisRecord>> {
        let reader_list = match (&selection.member_file, selection.missing_input()) {
            (Some(path), None) => path.clone(),
            (_, missing) => {
                return Err(SessionError::Validation(
                    missing.unwrap_or("select the reader list file").to_string(),
                ))
            }
        };

        let token = self.store.borrow_mut().begin_analysis()?;
        let _guard = AnalysisGuard {
            store: &self.store,
            token,
        };

        info!(
            "Analyzing {} borrow files with reader list {}",
            selection.borrow_files.len(),
            reader_list.display()
        );
        self.emit(SessionEvent::AnalysisStarted);

        let plan = PhasePlan::FULL_ANALYSIS;
        match self
            .full_analysis_steps(&plan, &reader_list, &selection.borrow_files)
            .await
        {
            Ok(record) => {
                self.emit(SessionEvent::Progress(plan.finished()));
                Ok(record)
            }
            Err(e) => {
                self.report_failure(&plan, &e);
                Err(e)
            }
        }
    }

    async fn full_analysis_steps(
        &self,
        plan: &PhasePlan,
        reader_list: &Path,
        borrow_files: &[PathBuf],
    ) -> SessionResult<Arc<AnalysisRecord>> {
        self.emit(SessionEvent::Progress(plan.enter(0)));
        let documents = self
            .engine_call(self.service.load_documents(reader_list, borrow_files))
            .await?;
        if documents.is_empty() {
            return Err(SessionError::NoData);
        }

        let count = documents.len();
        info!("Engine found {} reader documents", count);
        self.store.borrow_mut().set_documents(documents);
        self.emit(SessionEvent::DocumentsLoaded { count });

        self.emit(SessionEvent::Progress(plan.enter(1)));
        let record = Arc::new(self.engine_call(self.service.analyze_by_index(0)).await?);
        self.store
            .borrow_mut()
            .set_active_result(0, Arc::clone(&record))?;

        info!("Active document: [0] {}", record.reader_name);
        self.emit(SessionEvent::ActiveRecordChanged {
            index: 0,
            record: Arc::clone(&record),
        });
        Ok(record)
    }

    /// Analyze `index` and make it the active document.
    ///
    /// Switches may overlap; only the most recently issued one commits.
    pub async fn switch_active_document(&self, index: usize) -> SessionResult<SwitchOutcome> {
        let token = {
            let mut store = self.store.borrow_mut();
            if store.is_analyzing() {
                return Err(SessionError::Concurrency);
            }
            store.check_index(index)?;
            let token = store.issue_token();

            if store.active_index() == Some(index) {
                if let Some(record) = store.cached_record(index) {
                    debug!("Document {} is already active", index);
                    return Ok(SwitchOutcome::AlreadyActive(record));
                }
            }
            store.begin_switch();
            token
        };
        let _pending = SwitchGuard { store: &self.store };

        let plan = PhasePlan::SWITCH_DOCUMENT;
        self.emit(SessionEvent::Progress(plan.enter(0)));
        let result = self.engine_call(self.service.analyze_by_index(index)).await;

        if !self.store.borrow().is_latest(token) {
            debug!("Discarding stale result for document {} ({})", index, token);
            return Ok(SwitchOutcome::Superseded);
        }

        let record = match result {
            Ok(record) => Arc::new(record),
            Err(e) => {
                self.report_failure(&plan, &e);
                return Err(e);
            }
        };

        let committed = self
            .store
            .borrow_mut()
            .set_active_result(index, Arc::clone(&record));
        if let Err(e) = committed {
            self.report_failure(&plan, &e);
            return Err(e);
        }

        info!("Active document: [{}] {}", index, record.reader_name);
        self.emit(SessionEvent::ActiveRecordChanged {
            index,
            record: Arc::clone(&record),
        });
        self.emit(SessionEvent::Progress(plan.finished()));
        Ok(SwitchOutcome::Committed(record))
    }

    /// Number of documents the engine currently holds.
    pub async fn document_count(&self) -> SessionResult<usize> {
        self.engine_call(self.service.get_document_count()).await
    }

    /// Names of every loaded document, fetched from the engine.
    pub async fn document_names(&self) -> SessionResult<Vec<String>> {
        let count = self.document_count().await?;
        futures::future::try_join_all(
            (0..count).map(|index| self.engine_call(self.service.get_document_name(index))),
        )
        .await
    }

    /// The active document and its record, if nothing else is using the engine.
    fn idle_active_record(&self) -> SessionResult<(usize, Arc<AnalysisRecord>)> {
        let store = self.store.borrow();
        if store.is_analyzing() || store.has_pending_switch() {
            return Err(SessionError::Concurrency);
        }
        let record = store.active_record()?;
        // active_record succeeded, so there is an active index
        Ok((store.active_index().unwrap_or(0), record))
    }

    /// Export the engine report for the active document.
    ///
    /// Returns `Ok(None)` when the save dialog was cancelled. Fails with
    /// `Concurrency` while a document switch is pending or when one is
    /// issued before the engine is back on the active document.
    pub async fn export_report<P: PickerService>(&self, picker: &P) -> SessionResult<Option<PathBuf>> {
        let (index, record) = self.idle_active_record()?;

        let default_name = format!("{}_report.html", record.reader_name);
        let Some(path) = picker.save_file(&["html".to_string()], &default_name).await else {
            info!("Report export cancelled");
            return Ok(None);
        };

        // The session may have moved on while the dialog was open.
        if self.idle_active_record()?.0 != index {
            return Err(SessionError::Concurrency);
        }
        let token = self.store.borrow_mut().issue_token();

        let plan = PhasePlan::EXPORT_REPORT;
        // The engine reports on its most recently analyzed document, which a
        // discarded switch may have changed.
        let exported = async {
            self.emit(SessionEvent::Progress(plan.enter(0)));
            self.engine_call(self.service.analyze_by_index(index)).await?;
            if !self.store.borrow().is_latest(token) {
                debug!(
                    "Document switch issued during report export for {} ({})",
                    record.reader_name, token
                );
                return Err(SessionError::Concurrency);
            }
            self.emit(SessionEvent::Progress(plan.enter(1)));
            self.engine_call(self.service.export_report(&path)).await
        }
        .await;

        if let Err(e) = exported {
            self.report_failure(&plan, &e);
            return Err(e);
        }

        info!("Report written to {}", path.display());
        self.emit(SessionEvent::ReportsExported {
            paths: vec![path.clone()],
        });
        self.emit(SessionEvent::Progress(plan.finished()));
        Ok(Some(path))
    }

    /// Export one engine report per loaded document.
    ///
    /// Returns `Ok(None)` when the directory dialog was cancelled.
    pub async fn export_all_reports<P: PickerService>(
        &self,
        picker: &P,
    ) -> SessionResult<Option<Vec<PathBuf>>> {
        {
            let store = self.store.borrow();
            if store.is_analyzing() {
                return Err(SessionError::Concurrency);
            }
            if store.documents().is_empty() {
                return Err(SessionError::NotAnalyzed(None));
            }
        }

        let Some(dir) = picker.open_directory().await else {
            info!("Report export cancelled");
            return Ok(None);
        };

        let plan = PhasePlan::EXPORT_ALL;
        self.emit(SessionEvent::Progress(plan.enter(0)));
        let paths = match self
            .engine_call(self.service.export_all_reports(&dir))
            .await
        {
            Ok(paths) => paths,
            Err(e) => {
                self.report_failure(&plan, &e);
                return Err(e);
            }
        };

        info!("Exported {} reports to {}", paths.len(), dir.display());
        self.emit(SessionEvent::ReportsExported {
            paths: paths.clone(),
        });
        self.emit(SessionEvent::Progress(plan.finished()));
        Ok(Some(paths))
    }
}
