//! Directory listing tool.

use crate::paths::WorkspaceRoot;
use async_trait::async_trait;
use patchloop_core::error::ToolError;
use patchloop_core::tool::{Tool, ToolResult};

pub struct ListDirectoryTool {
    root: WorkspaceRoot,
}

impl ListDirectoryTool {
    pub fn new(root: WorkspaceRoot) -> Self {
        Self { root }
    }
}

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &str {
        "list_directory"
    }

    fn description(&self) -> &str {
        "List the contents of a directory. The quick tool to understand the file structure and explore the codebase."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "directory_path": {
                    "type": "string",
                    "description": "Absolute or relative workspace path; empty for the workspace root"
                }
            },
            "required": ["directory_path"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let requested = arguments["directory_path"].as_str().unwrap_or("").trim();
        let path = if requested.is_empty() || requested == "." {
            self.root.path().to_path_buf()
        } else {
            self.root
                .resolve(requested)
                .map_err(|e| ToolError::PermissionDenied {
                    tool_name: "list_directory".into(),
                    reason: e.to_string(),
                })?
        };

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(_) => {
                return Ok(ToolResult::failed(format!(
                    "Error: Path does not exist - {}",
                    path.display()
                )));
            }
        };
        if !metadata.is_dir() {
            return Ok(ToolResult::failed(format!(
                "Error: Path is not a directory - {}",
                path.display()
            )));
        }

        let mut dirs = Vec::new();
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(&path)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "list_directory".into(),
                reason: format!("Error reading directory: {e}"),
            })?;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().into_owned();
            match entry.file_type().await {
                Ok(t) if t.is_dir() => dirs.push(name),
                Ok(t) if t.is_file() => files.push(name),
                _ => {}
            }
        }
        dirs.sort();
        files.sort();

        let listing: Vec<String> = dirs
            .iter()
            .map(|d| format!("[DIR] {d}"))
            .chain(files.iter().map(|f| format!("[FILE] {f}")))
            .collect();
        Ok(ToolResult::ok(format!(
            "Contents of {}:\n\n{}",
            path.display(),
            listing.join("\n")
        )))
    }
}
