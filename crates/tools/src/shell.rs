//! Terminal tool: run a command in the workspace root.
//!
//! Supports command allowlisting and output truncation.

use crate::paths::WorkspaceRoot;
use crate::truncate_chars;
use async_trait::async_trait;
use patchloop_core::error::ToolError;
use patchloop_core::tool::{Tool, ToolResult};
use tokio::process::Command;
use tracing::{debug, warn};

const NAME: &str = "run_terminal_command";

/// Execute shell commands with the workspace as working directory.
pub struct ShellTool {
    root: WorkspaceRoot,
    /// If non-empty, only these commands are allowed.
    allowed_commands: Vec<String>,
    max_chars: usize,
}

impl ShellTool {
    pub fn new(root: WorkspaceRoot, allowed_commands: Vec<String>, max_chars: usize) -> Self {
        Self {
            root,
            allowed_commands,
            max_chars,
        }
    }

    fn is_command_allowed(&self, command: &str) -> bool {
        if self.allowed_commands.is_empty() {
            return true;
        }

        let base_cmd = command.split_whitespace().next().unwrap_or("").trim();
        self.allowed_commands.iter().any(|a| a == base_cmd)
    }
}

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Runs the provided command in a terminal in the workspace root and returns the result. Uses sh on Unix and cmd on Windows."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The command to be executed in the terminal"
                }
            },
            "required": ["command"],
            "additionalProperties": false
        })
    }

    fn describe(&self, arguments: &serde_json::Value) -> Option<String> {
        arguments["command"].as_str().map(|c| format!("`{c}`"))
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let command = arguments["command"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'command' argument".into()))?;

        if !self.is_command_allowed(command) {
            return Err(ToolError::PermissionDenied {
                tool_name: NAME.into(),
                reason: format!(
                    "Command '{}' not in allowlist",
                    command.split_whitespace().next().unwrap_or("")
                ),
            });
        }

        debug!(command = %command, cwd = %self.root.path().display(), "Executing shell command");

        let mut process = if cfg!(target_os = "windows") {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", command]);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", command]);
            cmd
        };
        let output = process
            .current_dir(self.root.path())
            .kill_on_drop(true)
            .output()
            .await;

        match output {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout).to_string();
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                let success = output.status.success();

                let result_text = if success {
                    if stderr.is_empty() {
                        stdout
                    } else {
                        format!("{stdout}\n[stderr]: {stderr}")
                    }
                } else {
                    let code = output.status.code().unwrap_or(-1);
                    warn!(command = %command, exit_code = code, "Command failed");
                    format!("[exit code: {code}]\n{stdout}\n{stderr}")
                };

                Ok(ToolResult {
                    call_id: String::new(),
                    success,
                    output: truncate_chars(result_text.trim(), self.max_chars).to_string(),
                })
            }
            Err(e) => Err(ToolError::ExecutionFailed {
                tool_name: NAME.into(),
                reason: e.to_string(),
            }),
        }
    }
}
