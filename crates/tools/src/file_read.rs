//! File read tool: a bounded range of lines from one file.

use crate::paths::WorkspaceRoot;
use async_trait::async_trait;
use patchloop_core::error::ToolError;
use patchloop_core::tool::{Tool, ToolResult};

/// Most lines returned by one call.
pub const MAX_LINES: usize = 250;

pub struct FileReadTool {
    root: WorkspaceRoot,
}

impl FileReadTool {
    pub fn new(root: WorkspaceRoot) -> Self {
        Self { root }
    }
}

/// Lines `first..=last` (1-based) of `content`, at most [`MAX_LINES`] of
/// them. A range running past the end is cut at the last line; one starting
/// before line 1 or past the end is invalid.
fn line_range(content: &str, first: i64, last: i64) -> Option<String> {
    let lines: Vec<&str> = content.lines().collect();
    if first < 1 || first > last {
        return None;
    }
    let start = (first - 1) as usize;
    if start >= lines.len() {
        return None;
    }
    let end = (last as usize).min(lines.len()).min(start + MAX_LINES);
    Some(lines[start..end].join("\n"))
}

#[async_trait]
impl Tool for FileReadTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file from first_line to last_line_inclusive (1-based), at most 250 lines at a time."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "The path of the file to read, absolute or relative to the workspace"
                },
                "first_line": {
                    "type": "integer",
                    "description": "The first line to read, starting at 1"
                },
                "last_line_inclusive": {
                    "type": "integer",
                    "description": "The last line to read, inclusive"
                }
            },
            "required": ["file_path", "first_line", "last_line_inclusive"],
            "additionalProperties": false
        })
    }

    fn describe(&self, arguments: &serde_json::Value) -> Option<String> {
        arguments["file_path"].as_str().map(str::to_string)
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let Some(file_path) = arguments["file_path"].as_str().filter(|p| !p.trim().is_empty()) else {
            return Ok(ToolResult::failed("The file is not provided."));
        };
        let first = arguments["first_line"].as_i64().unwrap_or(1);
        let last = arguments["last_line_inclusive"]
            .as_i64()
            .unwrap_or(first + MAX_LINES as i64 - 1);

        let path = self
            .root
            .resolve(file_path)
            .map_err(|e| ToolError::PermissionDenied {
                tool_name: "read_file".into(),
                reason: e.to_string(),
            })?;

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "read_file failed");
                return Ok(ToolResult::failed(format!("File not found: {file_path}")));
            }
        };

        Ok(match line_range(&content, first, last) {
            Some(text) => ToolResult::ok(text),
            None => ToolResult::failed("Invalid line range"),
        })
    }
}
