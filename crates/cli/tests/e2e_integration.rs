//! End-to-end tests for patchloop.
//!
//! These drive the full pipeline with a scripted backend: the agent loop,
//! the built-in tools against a real temporary workspace, the patch engine,
//! and the checkpoint store over a real `git` binary.

use std::sync::Arc;

use patchloop_agent::AgentLoop;
use patchloop_checkpoint::CheckpointStore;
use patchloop_config::{AppConfig, ToolsConfig};
use patchloop_core::error::ProviderError;
use patchloop_core::message::{Message, MessageToolCall, Role};
use patchloop_core::provider::{FinishReason, Provider, ProviderRequest, ProviderResponse};
use patchloop_tools::default_registry;

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that returns scripted responses in sequence.
struct ScriptedProvider {
    responses: std::sync::Mutex<Vec<ProviderResponse>>,
    requests: std::sync::Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses),
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last_request(&self) -> ProviderRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(ProviderError::NoResponse);
        }
        Ok(responses.remove(0))
    }
}

fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        finish_reason: FinishReason::Stop,
        usage: None,
        model: "e2e-model".into(),
    }
}

fn tool_response(name: &str, arguments: serde_json::Value) -> ProviderResponse {
    let call = MessageToolCall {
        id: format!("call_{name}"),
        name: name.into(),
        arguments: arguments.to_string(),
    };
    ProviderResponse {
        message: Message::assistant_with_tool_calls("", vec![call]),
        finish_reason: FinishReason::ToolCalls,
        usage: None,
        model: "e2e-model".into(),
    }
}

struct Fixture {
    _storage: tempfile::TempDir,
    workspace: tempfile::TempDir,
    store: Arc<CheckpointStore>,
}

async fn fixture() -> Fixture {
    let storage = tempfile::tempdir().unwrap();
    let workspace = tempfile::tempdir().unwrap();
    std::fs::write(workspace.path().join("greet.txt"), "hello\nworld\n").unwrap();
    let store = Arc::new(
        CheckpointStore::open(storage.path(), workspace.path())
            .await
            .unwrap(),
    );
    Fixture {
        _storage: storage,
        workspace,
        store,
    }
}

fn agent_for(fixture: &Fixture, provider: Arc<ScriptedProvider>) -> AgentLoop {
    let tools = default_registry(
        fixture.workspace.path(),
        &ToolsConfig::default(),
        Some(fixture.store.clone()),
    );
    AgentLoop::from_config(
        provider,
        Arc::new(tools),
        fixture.workspace.path(),
        &AppConfig::default(),
    )
    .with_checkpoints(fixture.store.clone())
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn patch_edit_is_written_and_checkpointed() {
    let fixture = fixture().await;
    let patch = "*** Begin Patch\n*** Update File: greet.txt\n@@\n hello\n-world\n+there\n*** End Patch";
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_response("read_file", serde_json::json!({"file_path": "greet.txt"})),
        tool_response("edit_file", serde_json::json!({"patch": patch})),
        text_response("Changed world to there."),
    ]));
    let agent = agent_for(&fixture, provider.clone());
    let mut session = agent.new_session();

    let answer = agent.run(&mut session, "replace world with there in @greet.txt").await;

    assert_eq!(answer, "Changed world to there.");
    assert_eq!(provider.calls(), 3);
    assert_eq!(
        std::fs::read_to_string(fixture.workspace.path().join("greet.txt")).unwrap(),
        "hello\nthere\n"
    );

    // The file mention was resolved to a full path in the user message
    let user = &session.messages()[1];
    assert_eq!(user.role, Role::User);
    assert!(!user.content.contains("@greet.txt"));
    assert!(user.content.contains("greet.txt"));

    // Tool output reached the backend
    let last = provider.last_request();
    let tool_outputs: Vec<&str> = last
        .messages
        .iter()
        .filter(|m| m.role == Role::Tool)
        .map(|m| m.content.as_str())
        .collect();
    assert!(tool_outputs[0].contains("hello"));
    assert!(tool_outputs[1].starts_with("Patch applied:"));

    // One new checkpoint on top of the initial snapshot
    let history = fixture.store.history(5).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[0].message.contains("replace world with there"));

    let diffs = fixture
        .store
        .diff_set(&history[1].hash, Some(&history[0].hash))
        .await
        .unwrap();
    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].relative_path, "greet.txt");
    assert_eq!(diffs[0].before, "hello\nworld\n");
    assert_eq!(diffs[0].after, "hello\nthere\n");
}

#[tokio::test]
async fn restore_undoes_an_agent_edit() {
    let fixture = fixture().await;
    let before = fixture.store.history(1).await.unwrap()[0].hash.clone();

    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_response(
            "edit_file",
            serde_json::json!({
                "file_path": "greet.txt",
                "changes": "```\ngreet.txt\n<<<<<<< SEARCH\nworld\n=======\nplanet\n>>>>>>> REPLACE\n```"
            }),
        ),
        tool_response("delete_file", serde_json::json!({"file_path": "greet.txt"})),
        text_response("done"),
    ]));
    let agent = agent_for(&fixture, provider);
    let mut session = agent.new_session();
    agent.run(&mut session, "edit then delete").await;
    assert!(!fixture.workspace.path().join("greet.txt").exists());

    fixture.store.restore_to_commit(&before).await.unwrap();

    assert_eq!(
        std::fs::read_to_string(fixture.workspace.path().join("greet.txt")).unwrap(),
        "hello\nworld\n"
    );
}

#[tokio::test]
async fn failed_patch_is_reported_to_the_backend() {
    let fixture = fixture().await;
    let bad = "*** Begin Patch\n*** Add File: greet.txt\n+again\n*** End Patch";
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_response("edit_file", serde_json::json!({"patch": bad})),
        text_response("could not add"),
    ]));
    let agent = agent_for(&fixture, provider.clone());
    let mut session = agent.new_session();

    let answer = agent.run(&mut session, "add greet.txt").await;

    assert_eq!(answer, "could not add");
    let tool_msg = &session.messages()[3];
    assert!(tool_msg.content.starts_with("Patch failed:"));
    assert!(tool_msg.content.contains("already exists"));
    assert_eq!(
        std::fs::read_to_string(fixture.workspace.path().join("greet.txt")).unwrap(),
        "hello\nworld\n"
    );
}

#[tokio::test]
async fn get_diff_shows_uncommitted_changes() {
    let fixture = fixture().await;
    std::fs::write(fixture.workspace.path().join("greet.txt"), "hello\nthere\n").unwrap();

    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_response("get_diff", serde_json::json!({})),
        text_response("shown"),
    ]));
    let agent = agent_for(&fixture, provider);
    let mut session = agent.new_session();
    agent.run(&mut session, "what changed?").await;

    let diff = &session.messages()[3].content;
    assert!(diff.contains("-world"));
    assert!(diff.contains("+there"));

    // get_diff does not mutate, so no checkpoint was added
    assert_eq!(fixture.store.history(5).await.unwrap().len(), 1);
}

#[tokio::test]
async fn paths_outside_the_workspace_are_refused() {
    let fixture = fixture().await;
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_response("read_file", serde_json::json!({"file_path": "../../etc/passwd"})),
        text_response("refused"),
    ]));
    let agent = agent_for(&fixture, provider);
    let mut session = agent.new_session();

    assert_eq!(agent.run(&mut session, "read secrets").await, "refused");
    assert!(session.messages()[3].content.starts_with("Error: "));
}

#[tokio::test]
async fn conversation_continues_across_runs_until_reset() {
    let fixture = fixture().await;
    let provider = Arc::new(ScriptedProvider::new(vec![
        text_response("first"),
        text_response("second"),
    ]));
    let agent = agent_for(&fixture, provider.clone());
    let mut session = agent.new_session();

    agent.run(&mut session, "one").await;
    agent.run(&mut session, "two").await;
    // System + (User + Assistant) * 2
    assert_eq!(session.messages().len(), 5);
    assert_eq!(provider.last_request().messages.len(), 4);

    session.reset_messages();
    assert_eq!(session.messages().len(), 1);
    assert!(session.log_text().is_empty());
}
