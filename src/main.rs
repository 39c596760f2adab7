//! codeloop - Session Entry Point
//!
//! Reads a task description from the command line, runs one session
//! against the configured model and sandbox, and prints the answer.

use std::sync::Arc;

use codeloop::agent::{Session, SessionStatus, SYSTEM_PROMPT};
use codeloop::config::Config;
use codeloop::llm::OpenAiCompatClient;
use codeloop::sandbox::HttpSandbox;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "codeloop=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        model = %config.model,
        sandbox = %config.sandbox_url,
        max_turns = config.max_turns,
        "loaded configuration"
    );

    let task = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    anyhow::ensure!(!task.trim().is_empty(), "usage: codeloop <task description>");

    let model = Arc::new(OpenAiCompatClient::new(
        config.model_base_url.clone(),
        config.model.clone(),
        config.api_key.clone(),
        config.model_timeout,
    ));
    let sandbox = Arc::new(HttpSandbox::new(
        config.sandbox_url.clone(),
        config.sandbox_timeout,
    ));

    let outcome = Session::new(&config, model, sandbox)
        .run(SYSTEM_PROMPT, &task)
        .await?;

    if outcome.status == SessionStatus::BudgetExhausted {
        warn!(
            turns = outcome.turns,
            "round budget exhausted before a final answer; printing the last turn's output"
        );
    }

    println!("{}", outcome.answer);
    Ok(())
}
