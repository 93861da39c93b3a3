//! Folding old transcript messages into a single summary message.
//!
//! Once a transcript's estimated size passes the configured budget, the
//! messages between the leading system prompt and the most recent few are
//! sent to the backend for a summary and replaced by one system message.

use patchloop_core::message::{Message, Role};
use std::ops::Range;

/// Prefix of the system message that replaces summarized messages.
pub const SUMMARY_PREFIX: &str = "Earlier conversation summary: ";
/// Used when the backend answers the summary request with nothing.
pub const NO_SUMMARY: &str = "No summary generated";

pub(crate) const SUMMARY_INSTRUCTION: &str = "Summarize the conversation above in a few \
    short paragraphs. Keep the user's goals, the files that were read or changed, decisions \
    that were made and anything still unfinished.";

/// When and how much of a transcript to summarize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryPolicy {
    /// Estimated token count above which old messages are summarized
    pub max_context_tokens: usize,
    /// Messages kept verbatim at the end
    pub keep_recent: usize,
}

/// The span of messages to fold into a summary, if any.
///
/// Leading system messages stay, except earlier summaries, which are folded
/// into the new one. The kept tail never starts with a tool message, so
/// every kept tool answer still follows the call it answers.
pub fn old_span(messages: &[Message], keep_recent: usize) -> Option<Range<usize>> {
    let head = messages
        .iter()
        .take_while(|m| m.role == Role::System && !m.content.starts_with(SUMMARY_PREFIX))
        .count();

    let mut tail = messages.len().saturating_sub(keep_recent);
    while tail > head && messages[tail].role == Role::Tool {
        tail -= 1;
    }

    (tail > head).then_some(head..tail)
}

/// The system message holding `summary`.
pub fn summary_message(summary: &str) -> Message {
    let summary = summary.trim();
    let summary = if summary.is_empty() { NO_SUMMARY } else { summary };
    Message::system(format!("{SUMMARY_PREFIX}{summary}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::call;

    fn transcript() -> Vec<Message> {
        vec![
            Message::system("sys"),
            Message::user("q1"),
            Message::assistant("a1"),
            Message::user("q2"),
            Message::assistant_with_tool_calls("", vec![call("c1", "noop", serde_json::json!({}))]),
            Message::tool_result("c1", "out"),
            Message::assistant("a2"),
        ]
    }

    #[test]
    fn span_lies_between_the_system_prompt_and_the_tail() {
        assert_eq!(old_span(&transcript(), 1), Some(1..6));
        assert_eq!(old_span(&transcript(), 4), Some(1..3));
    }

    #[test]
    fn tail_never_starts_with_a_tool_message() {
        // Keeping two would start the tail at the tool answer
        assert_eq!(old_span(&transcript(), 2), Some(1..4));
    }

    #[test]
    fn short_transcripts_have_nothing_to_fold() {
        assert_eq!(old_span(&transcript(), 6), None);
        assert_eq!(old_span(&transcript(), 50), None);
        assert_eq!(old_span(&[Message::system("sys")], 1), None);
    }

    #[test]
    fn earlier_summaries_are_folded_again() {
        let messages = vec![
            Message::system("sys"),
            summary_message("before"),
            Message::user("q"),
            Message::assistant("a"),
        ];
        assert_eq!(old_span(&messages, 1), Some(1..3));
    }

    #[test]
    fn empty_summaries_get_a_placeholder() {
        assert_eq!(
            summary_message("  \n").content,
            "Earlier conversation summary: No summary generated"
        );
        assert_eq!(
            summary_message(" did things ").content,
            "Earlier conversation summary: did things"
        );
    }
}
