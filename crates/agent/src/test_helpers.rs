//! Shared test helpers for agent loop tests.

use async_trait::async_trait;
use patchloop_core::error::{ProviderError, ToolError};
use patchloop_core::message::{Message, MessageToolCall};
use patchloop_core::provider::{FinishReason, Provider, ProviderRequest, ProviderResponse, Usage};
use patchloop_core::tool::{Tool, ToolResult};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

type Hook = Box<dyn Fn(usize) + Send + Sync>;

/// A provider that replays scripted responses.
///
/// Each call pops the next entry. When the queue is empty the `repeat`
/// response is returned if set, otherwise `NoResponse`.
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    repeat: Option<ProviderResponse>,
    on_call: Option<Hook>,
    calls: AtomicUsize,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            repeat: None,
            on_call: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replies(responses: Vec<ProviderResponse>) -> Self {
        Self::new(responses.into_iter().map(Ok).collect())
    }

    /// Answer every call with `response`.
    pub fn always(response: ProviderResponse) -> Self {
        let mut provider = Self::new(Vec::new());
        provider.repeat = Some(response);
        provider
    }

    /// Run `hook` with the 1-based call number during every call.
    pub fn on_call(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.on_call = Some(Box::new(hook));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().unwrap().push(request);
        if let Some(hook) = &self.on_call {
            hook(n);
        }
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => self.repeat.clone().ok_or(ProviderError::NoResponse),
        }
    }
}

/// A plain text answer that ends the run.
pub fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        finish_reason: FinishReason::Stop,
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// A response asking for `calls`.
pub fn tool_call_response(content: &str, calls: Vec<MessageToolCall>) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant_with_tool_calls(content, calls),
        finish_reason: FinishReason::ToolCalls,
        usage: None,
        model: "mock-model".into(),
    }
}

pub fn call(id: &str, name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: id.into(),
        name: name.into(),
        arguments: args.to_string(),
    }
}

/// A tool that counts invocations and runs an optional hook.
pub struct CountingTool {
    name: &'static str,
    mutates: bool,
    invocations: Arc<AtomicUsize>,
    hook: Option<Box<dyn Fn() + Send + Sync>>,
}

impl CountingTool {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            mutates: false,
            invocations: Arc::new(AtomicUsize::new(0)),
            hook: None,
        }
    }

    /// Shared invocation counter, readable after the tool is registered.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        self.invocations.clone()
    }

    pub fn mutating(mut self) -> Self {
        self.mutates = true;
        self
    }

    pub fn with_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }
}

#[async_trait]
impl Tool for CountingTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "test tool"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object"})
    }

    fn mutates_files(&self) -> bool {
        self.mutates
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let n = self.invocations.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(hook) = &self.hook {
            hook();
        }
        Ok(ToolResult::ok(format!("{} ran {n}", self.name)))
    }
}
