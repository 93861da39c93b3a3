//! Message and transcript domain types.
//!
//! The transcript is the only conversation state the agent keeps:
//! Caller sends a query → the loop appends it → the backend answers → tool
//! results are appended → the loop asks again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions
    System,
    /// The end user (or the caller acting for them)
    User,
    /// The language model
    Assistant,
    /// Tool execution result
    Tool,
}

/// A single message in a transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create an assistant message that requests tool calls.
    pub fn assistant_with_tool_calls(
        content: impl Into<String>,
        tool_calls: Vec<MessageToolCall>,
    ) -> Self {
        let mut msg = Self::assistant(content);
        msg.tool_calls = tool_calls;
        msg
    }

    /// Create a tool result message answering `tool_call_id`.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::with_role(Role::Tool, content);
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }
}

/// A tool call embedded in an assistant message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageToolCall {
    /// Unique ID for this tool call
    pub id: String,

    /// Name of the function to invoke
    pub name: String,

    /// Arguments as a JSON string, exactly as the backend produced them
    pub arguments: String,
}

/// An ordered, append-only transcript.
///
/// The only non-append operations are [`Conversation::reset`], which
/// replaces everything with a single system message, and
/// [`Conversation::compact`], used when old messages are summarized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Ordered messages
    pub messages: Vec<Message>,

    /// When this transcript was (re)started
    pub created_at: DateTime<Utc>,

    /// When the last message was added
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Start a transcript holding only `system_prompt`.
    pub fn with_system(system_prompt: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            messages: vec![Message::system(system_prompt)],
            created_at: now,
            updated_at: now,
        }
    }

    /// Add a message to the end of the transcript.
    pub fn push(&mut self, message: Message) {
        self.updated_at = Utc::now();
        self.messages.push(message);
    }

    /// Replace the whole transcript with a single system message.
    pub fn reset(&mut self, system_prompt: impl Into<String>) {
        *self = Self::with_system(system_prompt);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Replace the messages in `range` with `summary`, or drop them when
    /// there is none.
    pub fn compact(&mut self, range: Range<usize>, summary: Option<Message>) {
        self.updated_at = Utc::now();
        self.messages.splice(range, summary);
    }

    /// Get the total token count estimate (rough: 4 chars ≈ 1 token).
    pub fn estimated_tokens(&self) -> usize {
        self.messages.iter().map(|m| m.content.len() / 4).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_starts_with_system_message() {
        let conv = Conversation::with_system("be helpful");
        assert_eq!(conv.len(), 1);
        assert_eq!(conv.messages[0].role, Role::System);
        assert_eq!(conv.messages[0].content, "be helpful");
    }

    #[test]
    fn reset_replaces_everything() {
        let mut conv = Conversation::with_system("first");
        conv.push(Message::user("hello"));
        conv.push(Message::assistant("hi"));
        conv.reset("second");
        assert_eq!(conv.len(), 1);
        assert_eq!(conv.messages[0].content, "second");
    }

    #[test]
    fn tool_result_carries_call_id() {
        let msg = Message::tool_result("call_1", "ok");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn compact_replaces_a_span() {
        let mut conv = Conversation::with_system("sys");
        conv.push(Message::user("a"));
        conv.push(Message::assistant("b"));
        conv.push(Message::user("c"));

        conv.compact(1..3, Some(Message::system("summary")));
        let contents: Vec<&str> = conv.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["sys", "summary", "c"]);

        conv.compact(1..2, None);
        assert_eq!(conv.len(), 2);
        assert_eq!(conv.messages[1].content, "c");
    }

    #[test]
    fn role_serializes_lowercase() {
        let msg = Message::user("Test message");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"role\":\"user\""));
        assert!(!json.contains("tool_calls"));
    }

    #[test]
    fn conversation_token_estimate() {
        // "sys" is 3 chars → 0 tokens; 20 chars ≈ 5 tokens
        let mut conv = Conversation::with_system("sys");
        conv.push(Message::user("12345678901234567890"));
        assert_eq!(conv.estimated_tokens(), 5);
    }
}
