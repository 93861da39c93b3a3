//! The patchloop agent loop.
//!
//! A run sends the transcript to the backend, executes every requested tool
//! call in order, appends the results, and repeats until the backend
//! answers without tool calls, the iteration cap is reached, or the
//! session's [`StopHandle`] is triggered. Runs that changed files end with a
//! checkpoint commit. Long transcripts can be compacted at the start of a
//! run by summarizing their older messages.

pub mod loop_runner;
pub mod prompt;
pub mod query;
pub mod session;
pub mod summarize;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use loop_runner::{AGENT_STOPPED, AgentLoop, NO_RESPONSE, TOOL_NOT_FOUND};
pub use prompt::{DEFAULT_SYSTEM_PROMPT, system_prompt};
pub use query::WalkdirFiles;
pub use session::{Session, StopHandle};
pub use summarize::SummaryPolicy;
