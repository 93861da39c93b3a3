//! Per-run state: the transcript, the human-readable log, and the stop
//! signal.

use patchloop_core::cancel::CancellationToken;
use patchloop_core::message::{Conversation, Message};

/// One agent conversation.
///
/// The transcript is append-only between resets, apart from old messages
/// folded into a summary when the loop is configured to. A session must not
/// be driven by two runs at once; `AgentLoop::run` takes it by `&mut`.
///
/// A stopped run keeps the transcript it built so far, but the backend
/// answer it was waiting on is never appended. The next run's user message
/// can therefore directly follow an earlier user or tool message. Call
/// [`Session::reset_messages`] to start clean instead.
#[derive(Debug)]
pub struct Session {
    id: String,
    system_prompt: String,
    pub(crate) conversation: Conversation,
    log: String,
    pub(crate) token: CancellationToken,
}

/// A cloneable handle that stops the run in flight on its session.
///
/// Stopping is cooperative: an in-flight backend call or tool completes,
/// and the loop exits at its next check.
#[derive(Debug, Clone)]
pub struct StopHandle {
    token: CancellationToken,
}

impl StopHandle {
    pub fn stop(&self) {
        self.token.cancel();
    }
}

impl Session {
    /// A new session whose transcript holds only `system_prompt`.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        let system_prompt = system_prompt.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            conversation: Conversation::with_system(system_prompt.clone()),
            system_prompt,
            log: String::new(),
            token: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn messages(&self) -> &[Message] {
        &self.conversation.messages
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Markdown log of every run since the last reset.
    pub fn log_text(&self) -> &str {
        &self.log
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            token: self.token.clone(),
        }
    }

    /// Replace the transcript with the system message and clear the log.
    pub fn reset_messages(&mut self) {
        self.conversation.reset(self.system_prompt.clone());
        self.log.clear();
    }

    pub(crate) fn log(&mut self, text: impl AsRef<str>) {
        self.log.push_str(text.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchloop_core::message::Role;

    #[test]
    fn new_session_holds_only_the_system_prompt() {
        let session = Session::new("be careful");
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, Role::System);
        assert_eq!(session.messages()[0].content, "be careful");
        assert!(session.log_text().is_empty());
    }

    #[test]
    fn reset_clears_transcript_and_log() {
        let mut session = Session::new("sys");
        session.conversation.push(Message::user("hi"));
        session.conversation.push(Message::assistant("hello"));
        session.log("***hi***");

        session.reset_messages();

        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].content, "sys");
        assert!(session.log_text().is_empty());
    }

    #[test]
    fn stop_handle_trips_the_session_token() {
        let session = Session::new("sys");
        let handle = session.stop_handle();
        assert!(!session.token.is_cancelled());
        handle.clone().stop();
        assert!(session.token.is_cancelled());
    }

    #[test]
    fn sessions_get_distinct_ids() {
        assert_ne!(Session::new("a").id(), Session::new("a").id());
    }
}
