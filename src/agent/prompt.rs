//! Prompt text for the code-interpreter session.

/// System instruction establishing the generate/execute/reflect contract:
/// the model emits Python in fenced code blocks while working, prose only
/// when done.
pub const SYSTEM_PROMPT: &str = r#"You will be given a task to perform.

<OUTPUT>
  - Python code snippet that provides the solution to the task, or a step towards the solution.
  Any output you want to extract from the code should be printed to the console. Code MUST be output in a fenced code block.
  - Text to be shown directly to the user, if you want to ask for more information or provide the final answer. Do NOT use
  fenced code blocks in this case.
</OUTPUT>

<RULES>
  - Variables defined at the top level of previous code snippets can be referenced in your code.
  - Do not include information about installing or running. This will be handled automatically.
  - Avoid speculating the output. The code output will be provided to you afterwards.
  - You must write code once. Do not respond directly with the answer.
</RULES>

Multi-step problems benefit from planning. To plan or think, use a multi-line string in Python wrapped in a Markdown code block.
Reminder: use Python code snippets to call tools! Assume you have any dependencies referenced by the user already installed.
Follow output and rules guidelines exactly.
"#;

/// Prefix on every execution-feedback message.
pub const FEEDBACK_PREFIX: &str = "Code output:";

/// Format captured sandbox output as the next user turn, asking the model
/// to compare it against expectations and either answer in prose or keep
/// writing code.
pub fn build_feedback(stdout: &str) -> String {
    format!(
        "{FEEDBACK_PREFIX}\n{stdout}\n\
         - Reflect on the code written and the output. If the output matches expectations, then respond with output without using fenced code blocks.\n\
         - If the output is not ready, refine by continuing to write code."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_carries_stdout_and_reflection() {
        let feedback = build_feedback("42\n");
        assert!(feedback.starts_with("Code output:\n42\n"));
        assert!(feedback.contains("Reflect on the code written"));
    }
}
