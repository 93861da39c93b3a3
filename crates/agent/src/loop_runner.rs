//! The agent reasoning loop implementation.

use crate::query::{self, WalkdirFiles};
use crate::session::Session;
use crate::summarize::{self, SummaryPolicy};
use chrono::{DateTime, Utc};
use patchloop_checkpoint::CheckpointStore;
use patchloop_config::{AgentCommand, AppConfig};
use patchloop_core::error::ProviderError;
use patchloop_core::event::{DomainEvent, EventBus};
use patchloop_core::message::{Message, MessageToolCall};
use patchloop_core::provider::{Provider, ProviderRequest};
use patchloop_core::tool::{ToolCall, ToolRegistry};
use patchloop_core::workspace::{HostTools, NoHostTools, WorkspaceFiles};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Returned when a run observes its stop handle.
pub const AGENT_STOPPED: &str = "agent stopped";
/// Returned when the backend gives no usable answer.
pub const NO_RESPONSE: &str = "No response from AI";
/// Tool message for a name neither the registry nor the host knows.
pub const TOOL_NOT_FOUND: &str = "Tool not found";

/// Characters of the query kept in a checkpoint message.
const CHECKPOINT_QUERY_CHARS: usize = 50;

/// The agent loop: immutable configuration shared by every run.
///
/// Per-run state lives in the [`Session`] passed to [`AgentLoop::run`].
pub struct AgentLoop {
    /// The backend to use
    provider: Arc<dyn Provider>,

    model: String,
    temperature: f32,
    max_tokens: Option<u32>,

    /// Local tools, consulted first
    tools: Arc<ToolRegistry>,

    /// Tools served by the host, consulted for names the registry lacks
    host_tools: Arc<dyn HostTools>,

    /// Resolves `@name` mentions in queries
    files: Arc<dyn WorkspaceFiles>,

    workspace_root: PathBuf,

    /// Snapshot store committed to after runs that changed files
    checkpoints: Option<Arc<CheckpointStore>>,

    /// Maximum backend calls per run
    max_iterations: u32,

    /// Include tool arguments and results in the session log
    log_tool_calls: bool,

    /// Summarize old messages before a run when set
    summary: Option<SummaryPolicy>,

    /// Named prompts for [`AgentLoop::run_with_command`]
    commands: Vec<AgentCommand>,

    system_prompt: String,

    event_bus: Arc<EventBus>,
}

impl AgentLoop {
    /// Create a new agent loop over `workspace_root`.
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        workspace_root: impl Into<PathBuf>,
    ) -> Self {
        let workspace_root = workspace_root.into();
        Self {
            provider,
            model: "local".into(),
            temperature: 0.2,
            max_tokens: None,
            tools,
            host_tools: Arc::new(NoHostTools),
            files: Arc::new(WalkdirFiles::new(workspace_root.clone())),
            system_prompt: crate::prompt::DEFAULT_SYSTEM_PROMPT.to_string(),
            workspace_root,
            checkpoints: None,
            max_iterations: 50,
            log_tool_calls: false,
            summary: None,
            commands: Vec::new(),
            event_bus: Arc::new(EventBus::default()),
        }
    }

    /// Create an agent loop configured from `config`.
    pub fn from_config(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        workspace_root: impl Into<PathBuf>,
        config: &AppConfig,
    ) -> Self {
        let workspace_root = workspace_root.into();
        let system_prompt = crate::prompt::system_prompt(&workspace_root, &config.agent);
        let mut agent = Self::new(provider, tools, workspace_root)
            .with_model(config.model.clone())
            .with_temperature(config.temperature)
            .with_max_iterations(config.agent.max_iterations)
            .with_log_tool_calls(config.agent.log_tool_calls)
            .with_commands(config.agent.commands.clone())
            .with_system_prompt(system_prompt);
        if let Some(max) = config.max_tokens {
            agent = agent.with_max_tokens(max);
        }
        if config.agent.summarize_old_messages {
            agent = agent.with_summarization(SummaryPolicy {
                max_context_tokens: config.agent.max_context_tokens,
                keep_recent: config.agent.keep_recent_messages,
            });
        }
        agent
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the default max tokens per backend response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Set the maximum number of backend calls per run.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_host_tools(mut self, host_tools: Arc<dyn HostTools>) -> Self {
        self.host_tools = host_tools;
        self
    }

    pub fn with_workspace_files(mut self, files: Arc<dyn WorkspaceFiles>) -> Self {
        self.files = files;
        self
    }

    /// Commit a checkpoint after every run that changed files.
    pub fn with_checkpoints(mut self, store: Arc<CheckpointStore>) -> Self {
        self.checkpoints = Some(store);
        self
    }

    pub fn with_log_tool_calls(mut self, enabled: bool) -> Self {
        self.log_tool_calls = enabled;
        self
    }

    /// Summarize old messages at the start of a run once the transcript
    /// outgrows `policy`.
    pub fn with_summarization(mut self, policy: SummaryPolicy) -> Self {
        self.summary = Some(policy);
        self
    }

    pub fn with_commands(mut self, commands: Vec<AgentCommand>) -> Self {
        self.commands = commands;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// A fresh session starting from this loop's system prompt.
    pub fn new_session(&self) -> Session {
        Session::new(self.system_prompt.clone())
    }

    /// Process one query to completion.
    ///
    /// Returns the last assistant text, or [`AGENT_STOPPED`],
    /// [`NO_RESPONSE`], or `"An error occurred: ..."` when the run ends
    /// early. When any file-mutating tool ran, a checkpoint is committed
    /// whatever the outcome.
    pub async fn run(&self, session: &mut Session, query: &str) -> String {
        self.run_with_command(session, query, None).await
    }

    /// [`AgentLoop::run`], with the prompt of the named command appended to
    /// the query. An unknown name is logged and ignored.
    pub async fn run_with_command(
        &self,
        session: &mut Session,
        query: &str,
        command: Option<&str>,
    ) -> String {
        let started = Utc::now();
        session.token.reset();
        session.log(format!("***{}***\n\n", query.lines().collect::<Vec<_>>().join("  \n")));

        self.summarize_old_messages(session).await;

        let mut prepared = query::prepare(query, &self.workspace_root, self.files.as_ref()).await;
        if let Some(name) = command {
            match self.commands.iter().find(|c| c.name == name) {
                Some(command) => {
                    prepared.push_str("\n\n ");
                    prepared.push_str(&command.prompt);
                }
                None => warn!(command = %name, "Unknown agent command"),
            }
        }
        session.conversation.push(Message::user(prepared));

        let mut changed = Vec::new();
        let result = self.drive(session, &mut changed).await;

        if !changed.is_empty() {
            session.log("\n\nFiles changes:  \n");
            session.log(format!("{}  \n", changed.join("  \n")));
            self.checkpoint(session, started, query).await;
        }
        session.log("  \nAgent session finished. \n\n");
        result
    }

    /// The iteration loop proper. Records every mutating tool call in
    /// `changed`.
    async fn drive(&self, session: &mut Session, changed: &mut Vec<String>) -> String {
        let mut definitions = self.tools.definitions();
        definitions.extend(self.host_tools.definitions());
        let mut response_text = String::new();
        let mut iteration: u32 = 0;

        info!(session_id = %session.id(), messages = session.messages().len(), "Processing query");

        while iteration < self.max_iterations {
            if session.token.is_cancelled() {
                return self.stopped(session, iteration);
            }
            iteration += 1;
            debug!(session_id = %session.id(), iteration, "Agent loop iteration");

            let request = ProviderRequest {
                model: self.model.clone(),
                messages: session.messages().to_vec(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: definitions.clone(),
            };

            let response = match self.provider.complete(request).await {
                Ok(response) => response,
                Err(ProviderError::NoResponse) => {
                    warn!(session_id = %session.id(), iteration, "No response from backend");
                    session.log(format!("{NO_RESPONSE}  \n"));
                    return NO_RESPONSE.to_string();
                }
                Err(e) => {
                    warn!(session_id = %session.id(), error = %e, "Backend call failed");
                    self.event_bus.publish(DomainEvent::ErrorOccurred {
                        context: "backend".into(),
                        error_message: e.to_string(),
                        timestamp: Utc::now(),
                    });
                    session.log(format!("An error occurred: {e}\n\n"));
                    return format!("An error occurred: {e}");
                }
            };

            self.event_bus.publish(DomainEvent::ResponseGenerated {
                session_id: session.id().to_string(),
                model: response.model.clone(),
                tokens_used: response.usage.as_ref().map_or(0, |u| u.total_tokens),
                tool_calls: response.tool_calls().len(),
                timestamp: Utc::now(),
            });

            if !response.message.content.is_empty() {
                session.log(format!("{}  \n", response.message.content));
            }
            session.log(format!("  \nTotal iterations: {iteration}  \n"));

            // The answer to a stopped run is dropped, not recorded
            if session.token.is_cancelled() {
                return self.stopped(session, iteration);
            }

            response_text = response.message.content.clone();
            let wants_tools = response.wants_tools();
            let finish_reason = response.finish_reason.clone();
            let tool_calls = response.message.tool_calls.clone();
            session.conversation.push(response.message);

            if !wants_tools {
                session.log(format!("  \nFinish reason: {finish_reason:?}"));
                break;
            }

            for call in &tool_calls {
                let output = self.dispatch(session, call, changed).await;
                session.conversation.push(Message::tool_result(&call.id, output));
            }
        }

        if iteration >= self.max_iterations {
            warn!(session_id = %session.id(), iterations = iteration, "Max iterations reached");
        }
        response_text
    }

    /// Run one tool call and produce the text of its `tool` message.
    async fn dispatch(
        &self,
        session: &mut Session,
        call: &MessageToolCall,
        changed: &mut Vec<String>,
    ) -> String {
        session.log(format!("  \ntool: {}  \n", call.name));
        if self.log_tool_calls {
            session.log(format!("  \narguments: {}", call.arguments));
        }

        let arguments: serde_json::Value = if call.arguments.trim().is_empty() {
            serde_json::json!({})
        } else {
            match serde_json::from_str(&call.arguments) {
                Ok(arguments) => arguments,
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "Tool arguments are not valid JSON");
                    return format!("Error: invalid JSON arguments: {e}");
                }
            }
        };

        let start = std::time::Instant::now();
        let (output, success) = if let Some(tool) = self.tools.get(&call.name) {
            let description = tool.describe(&arguments);
            if let Some(description) = &description {
                session.log(format!("{description}\n\n"));
            }
            if tool.mutates_files() {
                changed.push(description.unwrap_or_else(|| call.name.clone()));
            }

            let tool_call = ToolCall {
                id: call.id.clone(),
                name: call.name.clone(),
                arguments,
            };
            match self.tools.execute(&tool_call).await {
                Ok(result) => (result.output, result.success),
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "Tool execution failed");
                    session.log(format!("Error during the execution of tool {}: {e}\n\n", call.name));
                    (format!("Error: {e}"), false)
                }
            }
        } else if self.host_tools.has(&call.name) {
            match self.host_tools.invoke(&call.name, arguments).await {
                Ok(output) => (output, true),
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "Host tool failed");
                    session.log(format!("Error during the execution of tool {}: {e}\n\n", call.name));
                    (format!("Error: {e}"), false)
                }
            }
        } else {
            warn!(tool = %call.name, "Tool not found");
            (TOOL_NOT_FOUND.to_string(), false)
        };

        self.event_bus.publish(DomainEvent::ToolExecuted {
            tool_name: call.name.clone(),
            success,
            duration_ms: start.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        });
        if self.log_tool_calls {
            session.log(format!("result:  \n{output}  \n"));
        }
        output
    }

    /// Fold old messages into a summary when the transcript is over budget.
    /// A failed summary request drops them instead.
    async fn summarize_old_messages(&self, session: &mut Session) {
        let Some(policy) = self.summary else {
            return;
        };
        let estimated = session.conversation.estimated_tokens();
        if estimated <= policy.max_context_tokens {
            return;
        }
        let Some(span) = summarize::old_span(session.messages(), policy.keep_recent) else {
            return;
        };

        let mut messages = session.messages()[span.clone()].to_vec();
        messages.push(Message::user(summarize::SUMMARY_INSTRUCTION));
        let request = ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: Vec::new(),
        };

        let summary = match self.provider.complete(request).await {
            Ok(response) => Some(summarize::summary_message(&response.message.content)),
            Err(e) => {
                warn!(session_id = %session.id(), error = %e, "Summary failed, dropping old messages");
                None
            }
        };
        info!(
            session_id = %session.id(),
            estimated_tokens = estimated,
            folded = span.len(),
            summarized = summary.is_some(),
            "Compacted transcript"
        );
        session.conversation.compact(span, summary);
    }

    fn stopped(&self, session: &mut Session, iterations: u32) -> String {
        info!(session_id = %session.id(), iterations, "Agent stopped");
        session.log("\n\nSession stopped.  \n");
        self.event_bus.publish(DomainEvent::AgentStopped {
            session_id: session.id().to_string(),
            iterations,
            timestamp: Utc::now(),
        });
        AGENT_STOPPED.to_string()
    }

    async fn checkpoint(&self, session: &Session, started: DateTime<Utc>, query: &str) {
        let Some(store) = &self.checkpoints else {
            return;
        };
        let summary: String = query.chars().take(CHECKPOINT_QUERY_CHARS).collect();
        let message = format!("{} {}", started.to_rfc3339(), summary);
        match store.commit(&message).await {
            Ok(hash) => {
                info!(session_id = %session.id(), hash = %hash, "Checkpoint created");
                self.event_bus.publish(DomainEvent::CheckpointCreated {
                    session_id: session.id().to_string(),
                    commit: hash,
                    message,
                    timestamp: Utc::now(),
                });
            }
            Err(e) => {
                warn!(session_id = %session.id(), error = %e, "Checkpoint commit failed");
                self.event_bus.publish(DomainEvent::ErrorOccurred {
                    context: "checkpoint".into(),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
            }
        }
    }
}
