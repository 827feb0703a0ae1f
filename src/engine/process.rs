//! Child-process transport: JSON lines over the engine's stdin/stdout.

use crate::engine::protocol::{parse_reply, EngineReply, EngineRequest};
use crate::error::{EngineError, EngineResult};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Engine hosted in a long-lived child process.
///
/// The process is started on first use and keeps the loaded documents
/// between calls. Requests are serialized over the single pipe pair.
pub struct ProcessEngine {
    program: String,
    args: Vec<String>,
    process: Mutex<Option<EngineProcess>>,
}

struct EngineProcess {
    _child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    /// Set while a request is written but its reply not yet read.
    awaiting_reply: bool,
}

impl ProcessEngine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            process: Mutex::new(None),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn spawn(&self) -> EngineResult<EngineProcess> {
        info!("Starting analysis engine: {} {:?}", self.program, self.args);

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                EngineError::Transport(format!("Failed to start engine '{}': {}", self.program, e))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Transport("engine stdin is not piped".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Transport("engine stdout is not piped".to_string()))?;

        Ok(EngineProcess {
            _child: child,
            stdin,
            stdout: BufReader::new(stdout),
            awaiting_reply: false,
        })
    }

    /// Send one request and wait for its reply.
    pub async fn call(&self, request: &EngineRequest) -> EngineResult<EngineReply> {
        let mut guard = self.process.lock().await;

        // A caller that gave up mid-exchange leaves an unread reply in the
        // pipe; the stream can no longer be matched to requests.
        if guard.as_ref().is_some_and(|p| p.awaiting_reply) {
            warn!("Engine stream out of sync after an abandoned request, restarting engine");
            *guard = None;
        }

        if guard.is_none() {
            *guard = Some(self.spawn()?);
        }

        let Some(process) = guard.as_mut() else {
            return Err(EngineError::Closed);
        };

        let result = process.exchange(request).await;
        if matches!(result, Err(EngineError::Closed) | Err(EngineError::Io(_))) {
            warn!("Engine process failed, it will be restarted on the next call");
            *guard = None;
        }
        result
    }
}

impl EngineProcess {
    async fn exchange(&mut self, request: &EngineRequest) -> EngineResult<EngineReply> {
        let mut line = serde_json::to_string(request)?;
        line.push('\n');

        debug!("engine <- {}", request.command());
        self.awaiting_reply = true;
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        let mut reply = String::new();
        let read = self.stdout.read_line(&mut reply).await?;
        self.awaiting_reply = false;

        if read == 0 {
            return Err(EngineError::Closed);
        }

        debug!("engine -> {} bytes", read);
        parse_reply(&reply)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::models::AnalysisRecord;

    fn stub_engine() -> ProcessEngine {
        let script = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/stub_engine.sh");
        ProcessEngine::new("sh", vec![script.to_string()])
    }

    #[tokio::test]
    async fn test_stub_engine_round_trip() {
        let engine = stub_engine();

        let count: usize = engine
            .call(&EngineRequest::GetDocumentCount)
            .await
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(count, 2);

        // Second call reuses the same process.
        let record: AnalysisRecord = engine
            .call(&EngineRequest::AnalyzeByIndex { index: 1 })
            .await
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(record.reader_name, "Stub Reader");
        assert_eq!(record.borrow_frequency, 10);
    }

    #[tokio::test]
    async fn test_stub_engine_error_reply() {
        let engine = stub_engine();
        let err = engine
            .call(&EngineRequest::ExportAllReports {
                base_output_dir: "/nonexistent".into(),
            })
            .await
            .unwrap()
            .into_result::<Vec<String>>()
            .unwrap_err();
        assert!(matches!(err, EngineError::Remote(ref m) if m == "unsupported command"));
    }

    #[tokio::test]
    async fn test_missing_program_is_transport_error() {
        let engine = ProcessEngine::new("/definitely/not/an/engine", vec![]);
        let err = engine
            .call(&EngineRequest::GetDocumentCount)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Transport(_)));
    }
}
