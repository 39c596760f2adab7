//! Extraction of fenced code blocks from model replies.

use std::sync::LazyLock;

use regex::Regex;

/// A fenced block: three backticks, an optional alphanumeric language tag,
/// a newline, then the body up to the first closing fence.
static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[a-zA-Z0-9]*\n((?s:.*?))```").unwrap());

/// Pull every fenced code block out of a reply.
///
/// Bodies are concatenated in source order, each followed by a newline, and
/// the final string is trimmed. A reply with no fenced block yields the
/// empty string — the loop reads that as "nothing to execute". Multiple
/// blocks in one reply run together as a single submission.
pub fn extract_code(text: &str) -> String {
    let mut code = String::new();
    for captures in FENCED_BLOCK.captures_iter(text) {
        code.push_str(&captures[1]);
        code.push('\n');
    }
    code.trim().to_string()
}
