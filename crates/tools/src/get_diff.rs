//! Diff tool: what changed since a checkpoint, as unified diffs.

use crate::truncate_chars;
use async_trait::async_trait;
use patchloop_checkpoint::{CheckpointStore, FileDiff};
use patchloop_core::error::ToolError;
use patchloop_core::tool::{Tool, ToolResult};
use similar::TextDiff;
use std::sync::Arc;

pub struct GetDiffTool {
    store: Option<Arc<CheckpointStore>>,
    max_chars: usize,
}

impl GetDiffTool {
    pub fn new(store: Option<Arc<CheckpointStore>>, max_chars: usize) -> Self {
        Self { store, max_chars }
    }
}

/// Render one changed file as a unified diff with `a/` and `b/` headers.
pub fn render_unified(diff: &FileDiff) -> String {
    TextDiff::from_lines(&diff.before, &diff.after)
        .unified_diff()
        .context_radius(3)
        .header(
            &format!("a/{}", diff.relative_path),
            &format!("b/{}", diff.relative_path),
        )
        .to_string()
}

fn failed(e: impl std::fmt::Display) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: "get_diff".into(),
        reason: e.to_string(),
    }
}

#[async_trait]
impl Tool for GetDiffTool {
    fn name(&self) -> &str {
        "get_diff"
    }

    fn description(&self) -> &str {
        "Show the changes made in the workspace since the last checkpoint (or since checkpoint `from`, up to checkpoint `to`) as unified diffs."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "from": {
                    "type": "string",
                    "description": "Checkpoint hash to diff from; defaults to the latest checkpoint"
                },
                "to": {
                    "type": "string",
                    "description": "Checkpoint hash to diff to; defaults to the current files"
                }
            },
            "additionalProperties": false
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let Some(store) = &self.store else {
            return Ok(ToolResult::failed("Checkpoints are disabled"));
        };

        let from = match arguments["from"].as_str().filter(|s| !s.is_empty()) {
            Some(hash) => hash.to_string(),
            None => match store.history(1).await.map_err(failed)?.into_iter().next() {
                Some(latest) => latest.hash,
                None => return Ok(ToolResult::failed("No checkpoints yet")),
            },
        };
        let to = arguments["to"].as_str().filter(|s| !s.is_empty());

        let diffs = match store.diff_set(&from, to).await {
            Ok(diffs) => diffs,
            Err(e) => return Ok(ToolResult::failed(e.to_string())),
        };
        if diffs.is_empty() {
            return Ok(ToolResult::ok("No changes"));
        }

        let rendered: String = diffs.iter().map(render_unified).collect();
        Ok(ToolResult::ok(truncate_chars(&rendered, self.max_chars)))
    }
}
