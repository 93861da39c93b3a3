//! File delete tool.

use crate::paths::WorkspaceRoot;
use async_trait::async_trait;
use patchloop_core::error::ToolError;
use patchloop_core::tool::{Tool, ToolResult};

pub struct DeleteFileTool {
    root: WorkspaceRoot,
}

impl DeleteFileTool {
    pub fn new(root: WorkspaceRoot) -> Self {
        Self { root }
    }
}

#[async_trait]
impl Tool for DeleteFileTool {
    fn name(&self) -> &str {
        "delete_file"
    }

    fn description(&self) -> &str {
        "Delete a file from the workspace."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "The path of the file to delete"
                }
            },
            "required": ["file_path"],
            "additionalProperties": false
        })
    }

    fn mutates_files(&self) -> bool {
        true
    }

    fn describe(&self, arguments: &serde_json::Value) -> Option<String> {
        arguments["file_path"].as_str().map(str::to_string)
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let file_path = arguments["file_path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'file_path' argument".into()))?;
        let path = self
            .root
            .resolve(file_path)
            .map_err(|e| ToolError::PermissionDenied {
                tool_name: "delete_file".into(),
                reason: e.to_string(),
            })?;

        if !tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_file()) {
            return Ok(ToolResult::failed(format!("File not found: {file_path}")));
        }
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(path = %file_path, "file deleted");
                Ok(ToolResult::ok(format!("Deleted {file_path}")))
            }
            Err(e) => Ok(ToolResult::failed(format!("Failed to delete {file_path}: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deletes_a_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("old.txt"), "bye").unwrap();
        let tool = DeleteFileTool::new(WorkspaceRoot::new(dir.path()));

        let result = tool
            .execute(serde_json::json!({"file_path": "old.txt"}))
            .await
            .unwrap();
        assert!(result.success);
        assert!(!dir.path().join("old.txt").exists());
    }

    #[tokio::test]
    async fn refuses_directories_and_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        let tool = DeleteFileTool::new(WorkspaceRoot::new(dir.path()));

        for path in ["src", "missing.txt"] {
            let result = tool
                .execute(serde_json::json!({"file_path": path}))
                .await
                .unwrap();
            assert_eq!(result.output, format!("File not found: {path}"));
        }
        assert!(dir.path().join("src").is_dir());
    }

    #[tokio::test]
    async fn cannot_delete_outside_the_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let tool = DeleteFileTool::new(WorkspaceRoot::new(dir.path()));
        let result = tool
            .execute(serde_json::json!({"file_path": "/etc/hosts"}))
            .await;
        assert!(matches!(result, Err(ToolError::PermissionDenied { .. })));
    }
}
