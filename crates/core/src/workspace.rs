//! Seams between the agent loop and its host environment.

use crate::error::ToolError;
use crate::provider::ToolDefinition;
use async_trait::async_trait;
use std::path::PathBuf;

/// Resolves the short names users type after `@` to files in the workspace.
#[async_trait]
pub trait WorkspaceFiles: Send + Sync {
    /// Find a file whose name (or workspace-relative path) is `short_name`.
    ///
    /// Returns `None` when no file matches; the reference is then left as
    /// typed.
    async fn find(&self, short_name: &str) -> Option<PathBuf>;
}

/// Tools hosted outside the local registry (an editor bridge, a remote
/// tool server, ...).
///
/// The agent loop consults these only for names its own registry lacks.
#[async_trait]
pub trait HostTools: Send + Sync {
    /// Whether a tool with this name is available.
    fn has(&self, name: &str) -> bool;

    /// Definitions advertised to the backend next to the registry's own.
    fn definitions(&self) -> Vec<ToolDefinition> {
        Vec::new()
    }

    /// Invoke the tool and return its textual result.
    async fn invoke(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> std::result::Result<String, ToolError>;
}

/// A host with no tools of its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHostTools;

#[async_trait]
impl HostTools for NoHostTools {
    fn has(&self, _name: &str) -> bool {
        false
    }

    async fn invoke(
        &self,
        name: &str,
        _arguments: serde_json::Value,
    ) -> std::result::Result<String, ToolError> {
        Err(ToolError::NotFound(name.to_string()))
    }
}
