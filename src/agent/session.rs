//! Core session loop.
//!
//! A [`Session`] drives the turn sequence: ask the model for a reply,
//! extract fenced code, either execute it in the sandbox and feed the
//! output back, or accept the reply as the final answer. The session owns
//! the history and the round state; the model and sandbox clients are
//! injected collaborators.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use super::prompt;
use crate::config::Config;
use crate::extract::extract_code;
use crate::history::{History, Message};
use crate::llm::{CompletionClient, LlmError};
use crate::sandbox::{CodeExecutor, ExecutionResult, SandboxError};

/// Per-round loop state. `turn` advances once per round regardless of what
/// the round produced; `has_executed` flips to true at the first sandbox
/// run and never back.
#[derive(Debug, Clone, Copy, Default)]
struct TurnState {
    turn: usize,
    has_executed: bool,
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// The model answered in prose after at least one execution.
    Answered,
    /// The round budget ran out; the answer is whatever the last completed
    /// turn appended. A soft cutoff, not a failure.
    BudgetExhausted,
    /// The caller cancelled; the history holds everything up to the last
    /// completed round.
    Cancelled,
}

/// Terminal result of a session.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub status: SessionStatus,
    /// Content of the last message in the history.
    pub answer: String,
    /// Rounds consumed, including retries that produced nothing.
    pub turns: usize,
    /// The full conversation as it stood when the session ended.
    pub history: History,
}

/// A failed session, tagged with where the loop stood when it died.
#[derive(Debug, Error)]
#[error("session failed on turn {turn}: {source}")]
pub struct SessionError {
    /// Zero-based round index of the failing call.
    pub turn: usize,
    /// Content of the last message appended before the failure.
    pub tail: Option<String>,
    #[source]
    pub source: SessionFailure,
}

#[derive(Debug, Error)]
pub enum SessionFailure {
    #[error(transparent)]
    Model(#[from] LlmError),
    #[error(transparent)]
    Sandbox(#[from] SandboxError),
}

/// One task-solving conversation between the model and the sandbox.
pub struct Session {
    id: Uuid,
    model: Arc<dyn CompletionClient>,
    executor: Arc<dyn CodeExecutor>,
    history: History,
    state: TurnState,
    max_turns: usize,
    modules: Vec<String>,
    model_timeout: Duration,
    sandbox_timeout: Duration,
    cancel: CancellationToken,
}

impl Session {
    pub fn new(
        config: &Config,
        model: Arc<dyn CompletionClient>,
        executor: Arc<dyn CodeExecutor>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            model,
            executor,
            history: History::new(),
            state: TurnState::default(),
            max_turns: config.max_turns,
            modules: config.modules.clone(),
            model_timeout: config.model_timeout,
            sandbox_timeout: config.sandbox_timeout,
            cancel: CancellationToken::new(),
        }
    }

    /// Thread a caller-owned cancellation token through the session.
    /// Cancelling it stops the loop between rounds and aborts any call
    /// still in flight.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run the loop to completion for one task.
    ///
    /// `instruction` seeds the history as the system message, `task` as the
    /// first user message. Returns the terminal outcome, or a
    /// [`SessionError`] if the model or the sandbox broke their contract
    /// mid-session.
    pub async fn run(
        mut self,
        instruction: &str,
        task: &str,
    ) -> Result<SessionOutcome, SessionError> {
        self.history.push(Message::system(instruction));
        self.history.push(Message::user(task));
        info!(session = %self.id, max_turns = self.max_turns, "session started");

        for turn in 0..self.max_turns {
            self.state.turn = turn;

            if self.cancel.is_cancelled() {
                info!(session = %self.id, turn, "session cancelled");
                return Ok(self.outcome(SessionStatus::Cancelled, turn));
            }

            let reply = match self.model_turn().await {
                Some(Ok(reply)) => reply,
                Some(Err(source)) => return Err(self.fail(source)),
                None => return Ok(self.outcome(SessionStatus::Cancelled, turn)),
            };

            let code = extract_code(&reply.content);

            if self.reply_is_final(&code) {
                info!(session = %self.id, turn, "model answered in prose");
                self.history.push(reply);
                return Ok(self.outcome(SessionStatus::Answered, turn + 1));
            }

            if code.is_empty() {
                // The model stalled before its first code block. Burn the
                // round, append nothing, ask again.
                debug!(session = %self.id, turn, "reply had no code before first execution");
                continue;
            }

            self.state.has_executed = true;
            debug!(
                session = %self.id,
                turn,
                "wrote code:\n\t{}",
                code.replace('\n', "\n\t")
            );

            // The reply and its feedback land in the history together, once
            // the execution actually completed. A failed or cancelled run
            // leaves the history at the last completed round.
            let result = match self.sandbox_turn(&code).await {
                Some(Ok(result)) => result,
                Some(Err(source)) => return Err(self.fail(source)),
                None => return Ok(self.outcome(SessionStatus::Cancelled, turn)),
            };

            self.history.push(reply);
            self.history
                .push(Message::user(prompt::build_feedback(&result.stdout)));
        }

        info!(session = %self.id, max_turns = self.max_turns, "round budget exhausted");
        let turns = self.max_turns;
        Ok(self.outcome(SessionStatus::BudgetExhausted, turns))
    }

    /// Termination policy: a reply with no extractable code is the final
    /// answer only once at least one execution has happened. The decision
    /// lives here so the policy can be swapped without touching the loop.
    fn reply_is_final(&self, code: &str) -> bool {
        code.is_empty() && self.state.has_executed
    }

    /// Call the model with the current history. `None` means the caller
    /// cancelled and the in-flight call was aborted.
    async fn model_turn(&self) -> Option<Result<Message, SessionFailure>> {
        let completion = self.model.complete(self.history.messages());
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = tokio::time::timeout(self.model_timeout, completion) => Some(match result {
                Ok(inner) => inner.map_err(SessionFailure::from),
                Err(_) => Err(LlmError::Timeout(self.model_timeout).into()),
            }),
        }
    }

    /// Run extracted code in the sandbox. `None` means the caller cancelled
    /// and the in-flight call was aborted.
    async fn sandbox_turn(
        &self,
        code: &str,
    ) -> Option<Result<ExecutionResult, SessionFailure>> {
        let execution = self.executor.run(code, &self.modules);
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = tokio::time::timeout(self.sandbox_timeout, execution) => Some(match result {
                Ok(inner) => inner.map_err(SessionFailure::from),
                Err(_) => Err(SandboxError::Timeout(self.sandbox_timeout).into()),
            }),
        }
    }

    fn outcome(self, status: SessionStatus, turns: usize) -> SessionOutcome {
        let answer = self
            .history
            .tail_content()
            .unwrap_or_default()
            .to_string();
        SessionOutcome {
            status,
            answer,
            turns,
            history: self.history,
        }
    }

    fn fail(&self, source: SessionFailure) -> SessionError {
        SessionError {
            turn: self.state.turn,
            tail: self.history.tail_content().map(str::to_string),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;
    use crate::history::Role;

    const CODE_REPLY: &str = "```python\nprint('step')\n```";

    struct ScriptedModel {
        replies: Mutex<VecDeque<Result<Message, LlmError>>>,
    }

    impl ScriptedModel {
        fn replies(contents: Vec<&str>) -> Arc<Self> {
            Self::scripted(contents.into_iter().map(|c| Ok(Message::assistant(c))).collect())
        }

        fn scripted(replies: Vec<Result<Message, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
            })
        }
    }

    #[async_trait::async_trait]
    impl CompletionClient for ScriptedModel {
        async fn complete(&self, _history: &[Message]) -> Result<Message, LlmError> {
            self.replies
                .lock()
                .expect("lock replies")
                .pop_front()
                .expect("model script exhausted")
        }
    }

    struct ScriptedSandbox {
        results: Mutex<VecDeque<Result<ExecutionResult, SandboxError>>>,
        submissions: Mutex<Vec<String>>,
    }

    impl ScriptedSandbox {
        fn stdout(outputs: Vec<&str>) -> Arc<Self> {
            Self::scripted(outputs.into_iter().map(|o| Ok(ok_result(o))).collect())
        }

        fn scripted(results: Vec<Result<ExecutionResult, SandboxError>>) -> Arc<Self> {
            Arc::new(Self {
                results: Mutex::new(results.into()),
                submissions: Mutex::new(Vec::new()),
            })
        }

        fn submission_count(&self) -> usize {
            self.submissions.lock().expect("lock submissions").len()
        }
    }

    #[async_trait::async_trait]
    impl CodeExecutor for ScriptedSandbox {
        async fn run(
            &self,
            code: &str,
            _modules: &[String],
        ) -> Result<ExecutionResult, SandboxError> {
            self.submissions
                .lock()
                .expect("lock submissions")
                .push(code.to_string());
            self.results
                .lock()
                .expect("lock results")
                .pop_front()
                .expect("sandbox script exhausted")
        }
    }

    fn ok_result(stdout: &str) -> ExecutionResult {
        serde_json::from_value(serde_json::json!({ "stdout": stdout }))
            .expect("build execution result")
    }

    fn test_config(max_turns: usize) -> Config {
        let mut config = Config::new(
            "http://127.0.0.1:1234/v1",
            "test-model",
            "http://127.0.0.1:3000",
        );
        config.max_turns = max_turns;
        config
    }

    #[tokio::test]
    async fn finishes_when_prose_follows_execution() {
        let model = ScriptedModel::replies(vec![CODE_REPLY, CODE_REPLY, "final answer"]);
        let sandbox = ScriptedSandbox::stdout(vec!["one\n", "two\n"]);

        let outcome = Session::new(&test_config(5), model, sandbox.clone())
            .run(prompt::SYSTEM_PROMPT, "task")
            .await
            .expect("session");

        assert_eq!(outcome.status, SessionStatus::Answered);
        assert_eq!(outcome.answer, "final answer");
        assert_eq!(outcome.turns, 3);
        assert_eq!(sandbox.submission_count(), 2);
        // system, task, then assistant/feedback per execution, then the answer
        assert_eq!(outcome.history.len(), 7);
        assert!(outcome.history.last_role_is(Role::Assistant));
    }

    #[tokio::test]
    async fn retries_before_first_execution_without_appending() {
        let model =
            ScriptedModel::replies(vec!["no code yet", "still prose", CODE_REPLY, "done"]);
        let sandbox = ScriptedSandbox::stdout(vec!["out\n"]);

        let outcome = Session::new(&test_config(5), model, sandbox.clone())
            .run(prompt::SYSTEM_PROMPT, "task")
            .await
            .expect("session");

        assert_eq!(outcome.status, SessionStatus::Answered);
        assert_eq!(outcome.turns, 4);
        assert_eq!(sandbox.submission_count(), 1);
        // The two codeless warm-up replies never reached the history.
        assert_eq!(outcome.history.len(), 5);
    }

    #[tokio::test]
    async fn budget_exhaustion_returns_last_feedback() {
        let model = ScriptedModel::replies(vec![CODE_REPLY, CODE_REPLY]);
        let sandbox = ScriptedSandbox::stdout(vec!["one\n", "two\n"]);

        let outcome = Session::new(&test_config(2), model, sandbox)
            .run(prompt::SYSTEM_PROMPT, "task")
            .await
            .expect("session");

        assert_eq!(outcome.status, SessionStatus::BudgetExhausted);
        assert_eq!(outcome.turns, 2);
        assert!(outcome.answer.starts_with("Code output:\ntwo"));
        assert!(outcome.history.last_role_is(Role::User));
    }

    #[tokio::test]
    async fn sandbox_failure_aborts_with_round_context() {
        let model = ScriptedModel::replies(vec![CODE_REPLY, CODE_REPLY, "unreached"]);
        let sandbox = ScriptedSandbox::scripted(vec![
            Ok(ok_result("one\n")),
            Err(SandboxError::Unavailable("connection refused".into())),
        ]);

        let err = Session::new(&test_config(5), model, sandbox)
            .run(prompt::SYSTEM_PROMPT, "task")
            .await
            .expect_err("sandbox outage must abort the session");

        assert_eq!(err.turn, 1);
        assert!(matches!(
            err.source,
            SessionFailure::Sandbox(SandboxError::Unavailable(_))
        ));
        // Everything through round 1 survived: the tail is round 1's feedback.
        let tail = err.tail.expect("history tail");
        assert!(tail.starts_with("Code output:\none"));
    }

    #[tokio::test]
    async fn model_protocol_violation_aborts() {
        let model = ScriptedModel::scripted(vec![Err(LlmError::UnclosedReasoning)]);
        let sandbox = ScriptedSandbox::stdout(vec![]);

        let err = Session::new(&test_config(5), model, sandbox)
            .run(prompt::SYSTEM_PROMPT, "task")
            .await
            .expect_err("protocol violation must abort the session");

        assert_eq!(err.turn, 0);
        assert!(matches!(
            err.source,
            SessionFailure::Model(LlmError::UnclosedReasoning)
        ));
    }

    struct HangingModel;

    #[async_trait::async_trait]
    impl CompletionClient for HangingModel {
        async fn complete(&self, _history: &[Message]) -> Result<Message, LlmError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn cancellation_aborts_an_in_flight_model_call() {
        let token = CancellationToken::new();
        let session = Session::new(
            &test_config(5),
            Arc::new(HangingModel),
            ScriptedSandbox::stdout(vec![]),
        )
        .with_cancellation(token.clone());

        let handle = tokio::spawn(session.run(prompt::SYSTEM_PROMPT, "task"));
        token.cancel();

        let outcome = handle
            .await
            .expect("join")
            .expect("cancellation is an outcome, not an error");
        assert_eq!(outcome.status, SessionStatus::Cancelled);
        assert_eq!(outcome.history.len(), 2);
    }

    #[tokio::test]
    async fn cancellation_stops_before_the_next_round() {
        let token = CancellationToken::new();
        token.cancel();

        let model = ScriptedModel::replies(vec![CODE_REPLY]);
        let sandbox = ScriptedSandbox::stdout(vec!["out\n"]);

        let outcome = Session::new(&test_config(5), model, sandbox)
            .with_cancellation(token)
            .run(prompt::SYSTEM_PROMPT, "task")
            .await
            .expect("session");

        assert_eq!(outcome.status, SessionStatus::Cancelled);
        assert_eq!(outcome.turns, 0);
        // Only the seed messages made it in.
        assert_eq!(outcome.history.len(), 2);
    }
}
