//! Agent module - the core session loop.
//!
//! The session follows a "code interpreter in a loop" pattern:
//! 1. Seed the history with the system instruction and the task
//! 2. Ask the model for a reply, extract fenced code from it
//! 3. If code was produced, run it in the sandbox and feed the output back
//! 4. Repeat until a prose answer arrives or the round budget is spent

mod prompt;
mod session;

pub use prompt::{build_feedback, FEEDBACK_PREFIX, SYSTEM_PROMPT};
pub use session::{Session, SessionError, SessionFailure, SessionOutcome, SessionStatus};
