//! Edit tool: apply a multi-file patch, or SEARCH/REPLACE blocks to one
//! file.

use crate::paths::WorkspaceRoot;
use async_trait::async_trait;
use patchloop_core::error::ToolError;
use patchloop_core::tool::{Tool, ToolResult};
use std::io;
use tracing::{debug, info};

const NAME: &str = "edit_file";

pub struct EditFileTool {
    root: WorkspaceRoot,
}

impl EditFileTool {
    pub fn new(root: WorkspaceRoot) -> Self {
        Self { root }
    }

    async fn apply_patch_text(&self, patch: String) -> Result<ToolResult, ToolError> {
        let root = self.root.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            let resolve = |path: &str| {
                root.resolve(path)
                    .map_err(|e| io::Error::new(io::ErrorKind::PermissionDenied, e.to_string()))
            };
            patchloop_patch::apply_patch(
                &patch,
                |path| std::fs::read_to_string(resolve(path)?),
                |path, content| {
                    let target = resolve(path)?;
                    if let Some(parent) = target.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(target, content)
                },
                |path| std::fs::remove_file(resolve(path)?),
            )
        })
        .await
        .map_err(|e| ToolError::ExecutionFailed {
            tool_name: NAME.into(),
            reason: e.to_string(),
        })?;

        Ok(match outcome {
            Ok(commit) => {
                info!(files = commit.changes.len(), "edit_file applied patch");
                ToolResult::ok(format!("Patch applied:\n{}", commit.to_string().trim_end()))
            }
            Err(e) => {
                debug!(error = %e, kind = ?e.kind(), "edit_file patch rejected");
                ToolResult::failed(format!("Patch failed: {e}"))
            }
        })
    }

    async fn apply_search_replace(&self, file_path: &str, changes: &str) -> Result<ToolResult, ToolError> {
        let path = self
            .root
            .resolve(file_path)
            .map_err(|e| ToolError::PermissionDenied {
                tool_name: NAME.into(),
                reason: e.to_string(),
            })?;

        let original = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Ok(ToolResult::failed(format!("Failed to read {file_path}: {e}"))),
        };

        let updated = patchloop_patch::apply_edits(&original, changes);
        if updated == original {
            return Ok(ToolResult::failed(format!(
                "No changes applied to {file_path}: no SEARCH block matched"
            )));
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ToolError::ExecutionFailed {
                    tool_name: NAME.into(),
                    reason: e.to_string(),
                })?;
        }
        if let Err(e) = tokio::fs::write(&path, &updated).await {
            return Ok(ToolResult::failed(format!("Failed to write {file_path}: {e}")));
        }
        info!(path = %file_path, "edit_file applied search/replace");
        Ok(ToolResult::ok(format!("Updated {file_path}")))
    }
}

#[async_trait]
impl Tool for EditFileTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Edit files. Either pass `patch`: a patch starting with '*** Begin Patch' and ending with '*** End Patch' \
         containing '*** Add File: <path>', '*** Update File: <path>' (with optional '*** Move to: <path>') or \
         '*** Delete File: <path>' sections, where update hunks use ' ' for context, '-' for removed and '+' for added lines. \
         Or pass `file_path` and `changes`: SEARCH/REPLACE blocks \
         (<<<<<<< SEARCH, old text, =======, new text, >>>>>>> REPLACE) applied to that one file."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "patch": {
                    "type": "string",
                    "description": "A complete multi-file patch"
                },
                "file_path": {
                    "type": "string",
                    "description": "The file the SEARCH/REPLACE changes apply to"
                },
                "changes": {
                    "type": "string",
                    "description": "One or more SEARCH/REPLACE blocks"
                }
            },
            "additionalProperties": false
        })
    }

    fn mutates_files(&self) -> bool {
        true
    }

    fn describe(&self, arguments: &serde_json::Value) -> Option<String> {
        if let Some(patch) = arguments["patch"].as_str() {
            let mut files = patchloop_patch::referenced_paths(patch);
            files.extend(patchloop_patch::added_paths(patch));
            return Some(files.join(", "));
        }
        arguments["file_path"].as_str().map(str::to_string)
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        if let Some(patch) = arguments["patch"].as_str() {
            return self.apply_patch_text(patch.to_string()).await;
        }

        match (arguments["file_path"].as_str(), arguments["changes"].as_str()) {
            (Some(file_path), Some(changes)) => self.apply_search_replace(file_path, changes).await,
            _ => Err(ToolError::InvalidArguments(
                "Pass either 'patch' or both 'file_path' and 'changes'".into(),
            )),
        }
    }
}
