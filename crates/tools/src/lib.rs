//! Built-in tool implementations for patchloop.
//!
//! Tools give the agent its hands on the workspace: run shell commands,
//! read, list and search files, apply patches, delete files, and inspect
//! what changed since the last checkpoint. Every path argument is confined
//! to the workspace root.

pub mod delete_file;
pub mod edit_file;
pub mod file_read;
pub mod get_diff;
pub mod list_directory;
pub mod paths;
pub mod regex_search;
pub mod shell;

use patchloop_checkpoint::CheckpointStore;
use patchloop_config::ToolsConfig;
use patchloop_core::tool::{Tool, ToolRegistry};
use std::path::Path;
use std::sync::Arc;

pub use paths::{PathError, WorkspaceRoot};

/// Create a registry with every built-in tool `config` enables.
///
/// `get_diff` reports that checkpoints are disabled when `checkpoints` is
/// `None`.
pub fn default_registry(
    workspace_root: &Path,
    config: &ToolsConfig,
    checkpoints: Option<Arc<CheckpointStore>>,
) -> ToolRegistry {
    let root = WorkspaceRoot::new(workspace_root);
    let max_chars = config.max_chars_tool_return;

    let tools: Vec<Box<dyn Tool>> = vec![
        Box::new(shell::ShellTool::new(
            root.clone(),
            config.allowed_commands.clone(),
            max_chars,
        )),
        Box::new(regex_search::RegexSearchTool::new(root.clone())),
        Box::new(file_read::FileReadTool::new(root.clone())),
        Box::new(list_directory::ListDirectoryTool::new(root.clone())),
        Box::new(edit_file::EditFileTool::new(root.clone())),
        Box::new(delete_file::DeleteFileTool::new(root.clone())),
        Box::new(get_diff::GetDiffTool::new(checkpoints, max_chars)),
    ];

    let mut registry = ToolRegistry::new();
    for tool in tools {
        if config.is_enabled(tool.name()) {
            registry.register(tool);
        } else {
            tracing::debug!(tool = tool.name(), "tool disabled by config");
        }
    }
    registry
}

/// Cut `text` to at most `max_chars` characters.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
