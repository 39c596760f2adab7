//! Configuration for the code-interpreter session.
//!
//! Everything can be set via environment variables:
//! - `MODEL_BASE_URL` - Optional. OpenAI-compatible API root. Defaults to `http://127.0.0.1:1234/v1`.
//! - `MODEL_NAME` - Optional. Model identifier. Defaults to `openai/gpt-oss-20b`.
//! - `MODEL_API_KEY` - Optional. Bearer key for the model endpoint; local servers usually need none.
//! - `SANDBOX_URL` - Optional. Code-execution endpoint. Defaults to `http://127.0.0.1:3000`.
//! - `SANDBOX_MODULES` - Optional. Comma-separated dependency names the sandbox makes available. Defaults to `requests,beautifulsoup4,markdownify`.
//! - `MAX_TURNS` - Optional. Round budget per session. Defaults to `5`.
//! - `MODEL_TIMEOUT_SECS` - Optional. Per-call model timeout. Defaults to `120`.
//! - `SANDBOX_TIMEOUT_SECS` - Optional. Per-call sandbox timeout. Defaults to `120`.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

const DEFAULT_MODEL_BASE_URL: &str = "http://127.0.0.1:1234/v1";
const DEFAULT_MODEL: &str = "openai/gpt-oss-20b";
const DEFAULT_SANDBOX_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_MODULES: &str = "requests,beautifulsoup4,markdownify";

/// Session configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// OpenAI-compatible API root, without a trailing slash
    pub model_base_url: String,

    /// Model identifier sent with every completion request
    pub model: String,

    /// Optional bearer key for the model endpoint
    pub api_key: Option<String>,

    /// Sandbox execution endpoint
    pub sandbox_url: String,

    /// Dependency names declared to the sandbox on every run
    pub modules: Vec<String>,

    /// Round budget per session
    pub max_turns: usize,

    /// Per-call timeout for model completions
    pub model_timeout: Duration,

    /// Per-call timeout for sandbox executions
    pub sandbox_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let model_base_url = std::env::var("MODEL_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_MODEL_BASE_URL.to_string());

        let model = std::env::var("MODEL_NAME").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let api_key = std::env::var("MODEL_API_KEY").ok();

        let sandbox_url =
            std::env::var("SANDBOX_URL").unwrap_or_else(|_| DEFAULT_SANDBOX_URL.to_string());

        let modules = parse_modules(
            &std::env::var("SANDBOX_MODULES").unwrap_or_else(|_| DEFAULT_MODULES.to_string()),
        );

        let max_turns = std::env::var("MAX_TURNS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("MAX_TURNS".to_string(), format!("{e}")))?;

        let model_timeout = parse_timeout("MODEL_TIMEOUT_SECS")?;
        let sandbox_timeout = parse_timeout("SANDBOX_TIMEOUT_SECS")?;

        Ok(Self {
            model_base_url,
            model,
            api_key,
            sandbox_url,
            modules,
            max_turns,
            model_timeout,
            sandbox_timeout,
        })
    }

    /// Create a config with custom endpoints (useful for testing).
    pub fn new(
        model_base_url: impl Into<String>,
        model: impl Into<String>,
        sandbox_url: impl Into<String>,
    ) -> Self {
        Self {
            model_base_url: model_base_url.into(),
            model: model.into(),
            api_key: None,
            sandbox_url: sandbox_url.into(),
            modules: parse_modules(DEFAULT_MODULES),
            max_turns: 5,
            model_timeout: Duration::from_secs(120),
            sandbox_timeout: Duration::from_secs(120),
        }
    }
}

fn parse_modules(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
        .collect()
}

fn parse_timeout(var: &str) -> Result<Duration, ConfigError> {
    let secs: u64 = std::env::var(var)
        .unwrap_or_else(|_| "120".to_string())
        .parse()
        .map_err(|e| ConfigError::InvalidValue(var.to_string(), format!("{e}")))?;
    Ok(Duration::from_secs(secs))
}
