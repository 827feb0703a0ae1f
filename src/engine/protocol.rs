//! Wire protocol shared by every engine transport.
//!
//! Requests are JSON objects tagged by `command`; replies are either
//! `{"ok": <value>}` or `{"error": "<message>"}`.

use crate::error::{EngineError, EngineResult};
use crate::models::DocumentDescriptor;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// A request sent to the analysis engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum EngineRequest {
    LoadDocuments {
        reader_list_path: PathBuf,
        borrow_paths: Vec<PathBuf>,
    },
    AnalyzeByIndex {
        index: usize,
    },
    GetDocumentCount,
    GetDocumentName {
        index: usize,
    },
    ExportReport {
        output_path: PathBuf,
    },
    ExportAllReports {
        base_output_dir: PathBuf,
    },
}

impl EngineRequest {
    /// Short name used in logs.
    pub fn command(&self) -> &'static str {
        match self {
            EngineRequest::LoadDocuments { .. } => "load_documents",
            EngineRequest::AnalyzeByIndex { .. } => "analyze_by_index",
            EngineRequest::GetDocumentCount => "get_document_count",
            EngineRequest::GetDocumentName { .. } => "get_document_name",
            EngineRequest::ExportReport { .. } => "export_report",
            EngineRequest::ExportAllReports { .. } => "export_all_reports",
        }
    }
}

/// A reply from the analysis engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineReply {
    Ok(Value),
    Error(String),
}

impl EngineReply {
    /// Convert the reply into the expected payload type.
    pub fn into_result<T: DeserializeOwned>(self) -> EngineResult<T> {
        match self {
            EngineReply::Ok(value) => Ok(serde_json::from_value(value)?),
            EngineReply::Error(message) => Err(EngineError::Remote(message)),
        }
    }
}

/// Parse one reply line.
pub fn parse_reply(line: &str) -> EngineResult<EngineReply> {
    let line = line.trim();
    if line.is_empty() {
        return Err(EngineError::Protocol("empty reply".to_string()));
    }
    serde_json::from_str(line).map_err(|e| EngineError::Protocol(format!("{}: {}", e, line)))
}

/// Document entry as reported by the engine's load step.
#[derive(Debug, Clone, Deserialize)]
pub struct WireDocument {
    #[serde(default)]
    pub file_path: Option<PathBuf>,
    #[serde(alias = "primary_name")]
    pub primary_reader_name: String,
    #[serde(default)]
    pub record_count: usize,
}

/// Assign canonical indices from the engine's return order.
pub fn into_descriptors(documents: Vec<WireDocument>) -> Vec<DocumentDescriptor> {
    documents
        .into_iter()
        .enumerate()
        .map(|(index, doc)| DocumentDescriptor {
            index,
            primary_name: doc.primary_reader_name,
            record_count: doc.record_count,
            source_path: doc.file_path,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_encoding() {
        let request = EngineRequest::LoadDocuments {
            reader_list_path: PathBuf::from("/data/readers.xlsx"),
            borrow_paths: vec![PathBuf::from("/data/a.xlsx")],
        };
        let encoded = serde_json::to_value(&request).unwrap();
        assert_eq!(
            encoded,
            json!({
                "command": "load_documents",
                "reader_list_path": "/data/readers.xlsx",
                "borrow_paths": ["/data/a.xlsx"]
            })
        );

        let encoded = serde_json::to_value(EngineRequest::GetDocumentCount).unwrap();
        assert_eq!(encoded, json!({"command": "get_document_count"}));
        assert_eq!(EngineRequest::AnalyzeByIndex { index: 1 }.command(), "analyze_by_index");
    }

    #[test]
    fn test_reply_ok_and_error() {
        let count: u32 = parse_reply(r#"{"ok": 4}"#).unwrap().into_result().unwrap();
        assert_eq!(count, 4);

        let err = parse_reply(r#"{"error": "workbook is locked"}"#)
            .unwrap()
            .into_result::<u32>()
            .unwrap_err();
        assert!(matches!(err, EngineError::Remote(ref m) if m == "workbook is locked"));
    }

    #[test]
    fn test_malformed_reply() {
        assert!(matches!(parse_reply(""), Err(EngineError::Protocol(_))));
        assert!(matches!(
            parse_reply("Traceback (most recent call last)"),
            Err(EngineError::Protocol(_))
        ));
    }

    #[test]
    fn test_descriptor_indices_follow_engine_order() {
        let wire: Vec<WireDocument> = serde_json::from_value(json!([
            {"file_path": "b.xlsx", "primary_reader_name": "Bo", "record_count": 3},
            {"primary_name": "Al", "record_count": 9}
        ]))
        .unwrap();

        let docs = into_descriptors(wire);
        assert_eq!(docs[0].index, 0);
        assert_eq!(docs[0].primary_name, "Bo");
        assert_eq!(docs[1].index, 1);
        assert_eq!(docs[1].record_count, 9);
        assert!(docs[1].source_path.is_none());
    }
}
