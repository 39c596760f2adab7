//! Execution client for the remote code sandbox.
//!
//! The sandbox is a locally reachable service that runs submitted code with
//! a declared set of dependencies and returns captured output. Isolation is
//! entirely the sandbox's concern; this client only carries the wire
//! contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("sandbox unreachable: {0}")]
    Unavailable(String),

    #[error("sandbox response missing expected fields: {0}")]
    MalformedResponse(String),

    #[error("sandbox execution timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Captured output of one sandbox run.
///
/// `stdout` is the only field the loop interprets. Anything else the
/// sandbox returns (return value, stderr) is retained opaquely in `extra`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionResult {
    pub stdout: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One synchronous code execution against the sandbox.
#[async_trait]
pub trait CodeExecutor: Send + Sync {
    /// Submit `code` with the dependency names the sandbox should make
    /// available, blocking until the sandbox returns.
    async fn run(&self, code: &str, modules: &[String]) -> Result<ExecutionResult, SandboxError>;
}

/// HTTP client for the sandbox endpoint.
pub struct HttpSandbox {
    client: reqwest::Client,
    url: String,
}

impl HttpSandbox {
    pub fn new(url: impl Into<String>, timeout: std::time::Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client with static configuration");

        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl CodeExecutor for HttpSandbox {
    async fn run(&self, code: &str, modules: &[String]) -> Result<ExecutionResult, SandboxError> {
        let request = RunRequest { modules, code };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SandboxError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SandboxError::Unavailable(format!(
                "status {status}: {message}"
            )));
        }

        let result: ExecutionResult = response
            .json()
            .await
            .map_err(|e| SandboxError::MalformedResponse(e.to_string()))?;

        tracing::debug!(stdout_bytes = result.stdout.len(), "sandbox returned");
        Ok(result)
    }
}

#[derive(Debug, Serialize)]
struct RunRequest<'a> {
    modules: &'a [String],
    code: &'a str,
}
