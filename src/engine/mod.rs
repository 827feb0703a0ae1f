//! Analysis engine access.
//!
//! The engine parses the workbooks and computes the statistics; this crate
//! only talks to it. `AnalysisService` is the contract the orchestrator
//! depends on, and `Backend` is the concrete engine chosen once from
//! configuration.

pub mod http;
pub mod process;
pub mod protocol;

#[cfg(test)]
pub mod scripted;

pub use http::HttpEngine;
pub use process::ProcessEngine;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{AnalysisRecord, DocumentDescriptor};
use protocol::{into_descriptors, EngineRequest, WireDocument};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Operations offered by an analysis engine.
///
/// Every call is a suspension point for the orchestrator.
pub trait AnalysisService {
    /// Load the workbooks and split them into per-reader documents.
    fn load_documents(
        &self,
        reader_list_path: &Path,
        borrow_paths: &[PathBuf],
    ) -> impl Future<Output = EngineResult<Vec<DocumentDescriptor>>>;

    /// Compute the statistics for one loaded document.
    fn analyze_by_index(&self, index: usize) -> impl Future<Output = EngineResult<AnalysisRecord>>;

    fn get_document_count(&self) -> impl Future<Output = EngineResult<usize>>;

    fn get_document_name(&self, index: usize) -> impl Future<Output = EngineResult<String>>;

    /// Write the report for the most recently analyzed document.
    fn export_report(&self, output_path: &Path) -> impl Future<Output = EngineResult<()>>;

    /// Write one report per document below `base_output_dir`.
    fn export_all_reports(
        &self,
        base_output_dir: &Path,
    ) -> impl Future<Output = EngineResult<Vec<PathBuf>>>;
}

/// Which engine transport to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Engine served over HTTP
    #[default]
    Http,
    /// Engine run as a child process speaking JSON lines
    Process,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Http => write!(f, "http"),
            BackendKind::Process => write!(f, "process"),
        }
    }
}

/// The configured engine.
pub enum Backend {
    Http(HttpEngine),
    Process(ProcessEngine),
}

impl Backend {
    /// Build the backend described by the configuration.
    pub fn from_config(config: &EngineConfig) -> EngineResult<Self> {
        match config.backend {
            BackendKind::Http => {
                let timeout = Duration::from_secs(config.timeout_seconds);
                Ok(Backend::Http(HttpEngine::new(&config.url, timeout)?))
            }
            BackendKind::Process => {
                let command = config.command.as_deref().ok_or_else(|| {
                    EngineError::Transport(
                        "The process backend needs an engine command (engine.command)".to_string(),
                    )
                })?;
                Ok(Backend::Process(ProcessEngine::new(
                    command,
                    config.args.clone(),
                )))
            }
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Http(_) => BackendKind::Http,
            Backend::Process(_) => BackendKind::Process,
        }
    }

    /// Human-readable target of the backend, for status output.
    pub fn describe(&self) -> String {
        match self {
            Backend::Http(engine) => engine.endpoint(),
            Backend::Process(engine) => engine.program().to_string(),
        }
    }

    async fn call<T: DeserializeOwned>(&self, request: EngineRequest) -> EngineResult<T> {
        let reply = match self {
            Backend::Http(engine) => engine.call(&request).await?,
            Backend::Process(engine) => engine.call(&request).await?,
        };
        reply.into_result()
    }
}

impl AnalysisService for Backend {
    async fn load_documents(
        &self,
        reader_list_path: &Path,
        borrow_paths: &[PathBuf],
    ) -> EngineResult<Vec<DocumentDescriptor>> {
        let documents: Vec<WireDocument> = self
            .call(EngineRequest::LoadDocuments {
                reader_list_path: reader_list_path.to_path_buf(),
                borrow_paths: borrow_paths.to_vec(),
            })
            .await?;
        Ok(into_descriptors(documents))
    }

    async fn analyze_by_index(&self, index: usize) -> EngineResult<AnalysisRecord> {
        self.call(EngineRequest::AnalyzeByIndex { index }).await
    }

    async fn get_document_count(&self) -> EngineResult<usize> {
        self.call(EngineRequest::GetDocumentCount).await
    }

    async fn get_document_name(&self, index: usize) -> EngineResult<String> {
        self.call(EngineRequest::GetDocumentName { index }).await
    }

    async fn export_report(&self, output_path: &Path) -> EngineResult<()> {
        let _: Value = self
            .call(EngineRequest::ExportReport {
                output_path: output_path.to_path_buf(),
            })
            .await?;
        Ok(())
    }

    async fn export_all_reports(&self, base_output_dir: &Path) -> EngineResult<Vec<PathBuf>> {
        self.call(EngineRequest::ExportAllReports {
            base_output_dir: base_output_dir.to_path_buf(),
        })
        .await
    }
}
