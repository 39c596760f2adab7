//! OpenAI-compatible chat-completions client.
//!
//! Works with any server speaking the `/chat/completions` wire format —
//! LM Studio, vLLM, Ollama, OpenRouter. Transport and authentication live
//! here; the loop only sees [`CompletionClient`].

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{strip_reasoning, CompletionClient, LlmError};
use crate::history::{Message, Role};

/// HTTP client for an OpenAI-compatible model endpoint.
pub struct OpenAiCompatClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiCompatClient {
    /// `base_url` is the API root without a trailing slash, e.g.
    /// `http://127.0.0.1:1234/v1`.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client with static configuration");

        Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
            api_key,
        }
    }
}

#[async_trait::async_trait]
impl CompletionClient for OpenAiCompatClient {
    async fn complete(&self, history: &[Message]) -> Result<Message, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages: history,
        };

        let mut req = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&request);

        if let Some(api_key) = &self.api_key {
            if !api_key.is_empty() {
                req = req.header("Authorization", format!("Bearer {api_key}"));
            }
        }

        let response = req
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyReply)?;

        let raw = choice
            .message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::EmptyReply)?;

        let content = strip_reasoning(&raw)?.to_string();
        tracing::debug!(model = %self.model, chars = content.len(), "model reply");

        Ok(Message {
            role: Role::Assistant,
            content,
            reasoning: choice.message.reasoning,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: WireMessage,
}

/// Reply message as it appears on the wire. Some servers return the
/// chain-of-thought in a separate `reasoning` field; it is carried through
/// untouched.
#[derive(Debug, Deserialize)]
struct WireMessage {
    content: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
}
