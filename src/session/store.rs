//! Session state: selection, documents, active index and result cache.

use crate::error::{SessionError, SessionResult};
use crate::models::{AnalysisRecord, DocumentDescriptor, InputSelection};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Sequence number handed to each orchestration call.
///
/// Tokens increase monotonically; only the most recently issued one may
/// commit results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Owner of all mutable session state.
#[derive(Debug, Default)]
pub struct SessionStore {
    selection: InputSelection,
    documents: Vec<DocumentDescriptor>,
    active_index: Option<usize>,
    result_cache: HashMap<usize, Arc<AnalysisRecord>>,
    /// Token of the full analysis in flight, if any.
    analysis: Option<RequestToken>,
    /// Document switches waiting on the engine.
    pending_switches: usize,
    last_issued: u64,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input_selection(&self) -> &InputSelection {
        &self.selection
    }

    /// Replace the input selection. Frozen while an analysis is running.
    pub fn set_input_selection(&mut self, selection: InputSelection) -> SessionResult<()> {
        if self.is_analyzing() {
            return Err(SessionError::Validation(
                "the input selection cannot change while an analysis is running".to_string(),
            ));
        }
        self.selection = selection;
        Ok(())
    }

    pub fn is_analyzing(&self) -> bool {
        self.analysis.is_some()
    }

    /// Issue the next request token, superseding every earlier one.
    pub fn issue_token(&mut self) -> RequestToken {
        self.last_issued += 1;
        RequestToken(self.last_issued)
    }

    /// Whether `token` is the most recently issued one.
    pub fn is_latest(&self, token: RequestToken) -> bool {
        token.0 == self.last_issued
    }

    /// Mark a full analysis as in flight.
    pub fn begin_analysis(&mut self) -> SessionResult<RequestToken> {
        if self.is_analyzing() {
            return Err(SessionError::Concurrency);
        }
        let token = self.issue_token();
        self.analysis = Some(token);
        debug!("Analysis {} started", token);
        Ok(token)
    }

    /// Clear the in-flight flag if `token` belongs to the running analysis.
    ///
    /// Returns `false` when the token is stale and nothing changed.
    pub fn end_analysis(&mut self, token: RequestToken) -> bool {
        if self.analysis == Some(token) {
            self.analysis = None;
            debug!("Analysis {} finished", token);
            true
        } else {
            warn!(
                "Ignoring completion of analysis {} (running: {:?})",
                token, self.analysis
            );
            false
        }
    }

    /// Record that a document switch is waiting on the engine.
    pub fn begin_switch(&mut self) {
        self.pending_switches += 1;
    }

    pub fn end_switch(&mut self) {
        self.pending_switches = self.pending_switches.saturating_sub(1);
    }

    /// Whether any document switch is still waiting on the engine.
    pub fn has_pending_switch(&self) -> bool {
        self.pending_switches > 0
    }

    /// Replace the document list, dropping every cached result.
    pub fn set_documents(&mut self, documents: Vec<DocumentDescriptor>) {
        self.active_index = if documents.is_empty() { None } else { Some(0) };
        self.documents = documents;
        self.result_cache.clear();
    }

    pub fn documents(&self) -> &[DocumentDescriptor] {
        &self.documents
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active_index
    }

    pub fn check_index(&self, index: usize) -> SessionResult<()> {
        if index < self.documents.len() {
            Ok(())
        } else {
            Err(SessionError::OutOfRange {
                index,
                len: self.documents.len(),
            })
        }
    }

    /// Cache a complete record and make its document active.
    pub fn set_active_result(
        &mut self,
        index: usize,
        record: Arc<AnalysisRecord>,
    ) -> SessionResult<()> {
        self.check_index(index)?;
        self.result_cache.insert(index, record);
        self.active_index = Some(index);
        Ok(())
    }

    /// The cached record of the active document.
    pub fn active_record(&self) -> SessionResult<Arc<AnalysisRecord>> {
        let index = self.active_index.ok_or(SessionError::NotAnalyzed(None))?;
        self.result_cache
            .get(&index)
            .cloned()
            .ok_or(SessionError::NotAnalyzed(Some(index)))
    }

    pub fn cached_record(&self, index: usize) -> Option<Arc<AnalysisRecord>> {
        self.result_cache.get(&index).cloned()
    }
}
