//! # codeloop
//!
//! A code-interpreter agent loop.
//!
//! A session coordinates two external services — a language model and a
//! remote code-execution sandbox — to solve a task through repeated rounds
//! of "generate code, execute it, reflect on the output" until the model
//! answers in prose or the round budget runs out.
//!
//! ## Architecture
//!
//! Each round:
//! 1. Send the full conversation history to the model
//! 2. Extract fenced code blocks from the reply
//! 3. No code after a prior execution: the reply is the final answer
//! 4. Otherwise run the code in the sandbox and append its stdout as the
//!    next user turn, then repeat
//!
//! The model and the sandbox are reached through the [`llm::CompletionClient`]
//! and [`sandbox::CodeExecutor`] trait seams, so sessions can be driven
//! against scripted collaborators in tests.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use codeloop::{agent::SYSTEM_PROMPT, Config, Session};
//! use codeloop::llm::OpenAiCompatClient;
//! use codeloop::sandbox::HttpSandbox;
//!
//! let config = Config::from_env()?;
//! let model = Arc::new(OpenAiCompatClient::new(
//!     config.model_base_url.clone(),
//!     config.model.clone(),
//!     config.api_key.clone(),
//!     config.model_timeout,
//! ));
//! let sandbox = Arc::new(HttpSandbox::new(config.sandbox_url.clone(), config.sandbox_timeout));
//! let outcome = Session::new(&config, model, sandbox)
//!     .run(SYSTEM_PROMPT, "Summarize today's top HackerNews post")
//!     .await?;
//! println!("{}", outcome.answer);
//! ```

pub mod agent;
pub mod config;
pub mod extract;
pub mod history;
pub mod llm;
pub mod sandbox;

pub use agent::{Session, SessionOutcome, SessionStatus};
pub use config::Config;
