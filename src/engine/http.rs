//! HTTP transport for an engine running as a local service.

use crate::engine::protocol::{parse_reply, EngineReply, EngineRequest};
use crate::error::{EngineError, EngineResult};
use std::time::Duration;
use tracing::debug;

/// Engine reached through `POST {base_url}/rpc`.
pub struct HttpEngine {
    client: reqwest::Client,
    base_url: String,
    timeout_seconds: u64,
}

impl HttpEngine {
    /// Create a client for the engine at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> EngineResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_seconds: timeout.as_secs(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/rpc", self.base_url)
    }

    /// Send one request and wait for its reply.
    pub async fn call(&self, request: &EngineRequest) -> EngineResult<EngineReply> {
        let url = self.endpoint();
        debug!("POST {} ({})", url, request.command());

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EngineError::Transport(format!(
                        "Request timed out after {}s",
                        self.timeout_seconds
                    ))
                } else if e.is_connect() {
                    EngineError::Transport(format!(
                        "Cannot connect to analysis engine at {}. Is it running?",
                        self.base_url
                    ))
                } else {
                    EngineError::Transport(format!("Failed to send request: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Transport(format!(
                "Engine API error {}: {}",
                status, body
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| EngineError::Transport(format!("Failed to read engine reply: {}", e)))?;

        parse_reply(&body)
    }
}
