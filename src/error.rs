//! Error types for the session core.

use std::time::Duration;
use thiserror::Error;

/// Failures surfaced by session and orchestration operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Incomplete selection or selection changed mid-run. Nothing was mutated.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Another analysis run is still in flight.
    #[error("Another analysis is already running")]
    Concurrency,

    /// The engine found no documents in the selected inputs.
    #[error("No reader documents were found in the selected files")]
    NoData,

    #[error("Document index {index} is out of range (session has {len} documents)")]
    OutOfRange { index: usize, len: usize },

    #[error("{}", not_analyzed_message(.0))]
    NotAnalyzed(Option<usize>),

    #[error("Analysis engine did not respond within {}s", whole_seconds(.0))]
    Timeout(Duration),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

fn not_analyzed_message(index: &Option<usize>) -> String {
    match index {
        Some(index) => format!("Document {} has not been analyzed", index),
        None => "No document has been analyzed yet".to_string(),
    }
}

fn whole_seconds(duration: &Duration) -> u64 {
    duration.as_secs()
}

/// Failures reported by an analysis engine backend.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Error message produced by the engine itself, passed through verbatim.
    #[error("{0}")]
    Remote(String),

    #[error("Engine transport error: {0}")]
    Transport(String),

    #[error("Malformed engine reply: {0}")]
    Protocol(String),

    #[error("Engine process closed its output")]
    Closed,

    #[error("Engine I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Engine payload error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures from the chart registry and its rendering backend.
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("No live chart in slot '{0}'")]
    NotFound(String),

    #[error("Chart rendering failed: {0}")]
    Render(String),

    #[error("Chart encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;
pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_is_verbatim() {
        let err = SessionError::from(EngineError::Remote("sheet 'Borrow' missing".to_string()));
        assert_eq!(err.to_string(), "sheet 'Borrow' missing");
    }

    #[test]
    fn test_not_analyzed_message() {
        assert_eq!(
            SessionError::NotAnalyzed(Some(3)).to_string(),
            "Document 3 has not been analyzed"
        );
        assert_eq!(
            SessionError::NotAnalyzed(None).to_string(),
            "No document has been analyzed yet"
        );
    }

    #[test]
    fn test_timeout_message() {
        let err = SessionError::Timeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "Analysis engine did not respond within 30s");
    }
}
