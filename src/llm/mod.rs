//! Model client: the completion seam and reply normalization.
//!
//! The session talks to the model through the [`CompletionClient`] trait so
//! collaborators can be injected — a scripted stand-in under test, the
//! OpenAI-compatible HTTP client in production.

mod openai_compat;

pub use openai_compat::OpenAiCompatClient;

use async_trait::async_trait;
use thiserror::Error;

use crate::history::Message;

/// Opening marker wrapping chain-of-thought text in raw replies.
pub const THINK_OPEN: &str = "<think>";
/// Closing marker for chain-of-thought text.
pub const THINK_CLOSE: &str = "</think>";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("model endpoint unreachable: {0}")]
    Network(String),

    #[error("model endpoint returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("could not decode model response: {0}")]
    MalformedResponse(String),

    #[error("model returned an empty reply")]
    EmptyReply,

    #[error("reasoning marker `<think>` was never closed")]
    UnclosedReasoning,

    #[error("model call timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// One completion round against the model endpoint.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send the full history and return exactly one assistant message with
    /// normalized content (chain-of-thought stripped).
    async fn complete(&self, history: &[Message]) -> Result<Message, LlmError>;
}

/// Drop a leading chain-of-thought section from raw reply content.
///
/// Everything up to and including the first [`THINK_CLOSE`] is discarded
/// and the trimmed remainder returned. Content without an opening marker
/// passes through untouched. An opening marker that is never closed is a
/// protocol violation by the upstream model, surfaced as
/// [`LlmError::UnclosedReasoning`].
pub fn strip_reasoning(content: &str) -> Result<&str, LlmError> {
    if !content.contains(THINK_OPEN) {
        return Ok(content.trim());
    }
    match content.split_once(THINK_CLOSE) {
        Some((_, visible)) => Ok(visible.trim()),
        None => Err(LlmError::UnclosedReasoning),
    }
}
