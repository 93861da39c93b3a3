//! Regex search over the workspace's text files.

use crate::paths::WorkspaceRoot;
use async_trait::async_trait;
use glob::Pattern;
use patchloop_core::error::ToolError;
use patchloop_core::tool::{Tool, ToolResult};
use regex_lite::Regex;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// Most matches returned by one search.
pub const MAX_MATCHES: usize = 50;

/// Directories never searched.
const SKIPPED_DIRS: &[&str] = &[
    ".git",
    ".git_tmp",
    "node_modules",
    "target",
    "dist",
    "build",
    "__pycache__",
    ".venv",
    "venv",
];

/// Files larger than this are not searched.
const MAX_FILE_BYTES: u64 = 1024 * 1024;

pub struct RegexSearchTool {
    root: WorkspaceRoot,
}

impl RegexSearchTool {
    pub fn new(root: WorkspaceRoot) -> Self {
        Self { root }
    }
}

fn optional_pattern(arguments: &serde_json::Value, key: &str) -> Result<Option<Pattern>, ToolError> {
    match arguments[key].as_str().map(str::trim) {
        None | Some("") => Ok(None),
        Some(p) => Pattern::new(p)
            .map(Some)
            .map_err(|e| ToolError::InvalidArguments(format!("Bad {key} '{p}': {e}"))),
    }
}

fn is_skipped(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

/// Walk `root` and collect up to [`MAX_MATCHES`] `path:line: text` hits.
fn search(
    root: &Path,
    regex: &Regex,
    include: Option<&Pattern>,
    exclude: Option<&Pattern>,
) -> Vec<String> {
    let mut matches = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_skipped(e))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file());

    for entry in walker {
        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        if include.is_some_and(|p| !p.matches(&relative)) || exclude.is_some_and(|p| p.matches(&relative)) {
            continue;
        }
        if entry.metadata().map(|m| m.len() > MAX_FILE_BYTES).unwrap_or(true) {
            continue;
        }
        // Binary and non-UTF-8 files are skipped
        let Ok(content) = std::fs::read_to_string(entry.path()) else {
            continue;
        };

        for (index, line) in content.lines().enumerate() {
            if regex.is_match(line) {
                matches.push(format!("{relative}:{}: {line}", index + 1));
                if matches.len() >= MAX_MATCHES {
                    return matches;
                }
            }
        }
    }
    matches
}

#[async_trait]
impl Tool for RegexSearchTool {
    fn name(&self) -> &str {
        "regex_search"
    }

    fn description(&self) -> &str {
        "Fast text-based regex search in the code base (prefer it for finding exact function names or expressions). Returns up to 50 matches in format file_name:line_number: line_content"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "regex": {
                    "type": "string",
                    "description": "The regular expression to search for. Escape special characters when needed."
                },
                "include_pattern": {
                    "type": "string",
                    "description": "Glob pattern for files to include (e.g. '*.rs'); empty for all files"
                },
                "exclude_pattern": {
                    "type": "string",
                    "description": "Glob pattern for files to exclude; empty for none"
                }
            },
            "required": ["regex"],
            "additionalProperties": false
        })
    }

    fn describe(&self, arguments: &serde_json::Value) -> Option<String> {
        arguments["regex"].as_str().map(|r| format!("/{r}/"))
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let pattern = arguments["regex"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'regex' argument".into()))?;
        let regex = match Regex::new(pattern) {
            Ok(regex) => regex,
            Err(e) => return Ok(ToolResult::failed(format!("Invalid regex: {e}"))),
        };
        let include = optional_pattern(&arguments, "include_pattern")?;
        let exclude = optional_pattern(&arguments, "exclude_pattern")?;

        let root = self.root.path().to_path_buf();
        let matches = tokio::task::spawn_blocking(move || {
            search(&root, &regex, include.as_ref(), exclude.as_ref())
        })
        .await
        .map_err(|e| ToolError::ExecutionFailed {
            tool_name: "regex_search".into(),
            reason: e.to_string(),
        })?;

        tracing::debug!(regex = %pattern, matches = matches.len(), "regex search finished");
        if matches.is_empty() {
            return Ok(ToolResult::ok("No matches found"));
        }
        Ok(ToolResult::ok(matches.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> (tempfile::TempDir, RegexSearchTool) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::create_dir_all(root.join("node_modules/dep")).unwrap();
        std::fs::write(root.join("src/lib.rs"), "pub fn alpha() {}\nfn beta() {}\n").unwrap();
        std::fs::write(root.join("src/main.rs"), "fn main() { alpha(); }\n").unwrap();
        std::fs::write(root.join("notes.md"), "alpha release\n").unwrap();
        std::fs::write(root.join("node_modules/dep/index.js"), "alpha\n").unwrap();
        let tool = RegexSearchTool::new(WorkspaceRoot::new(root));
        (dir, tool)
    }

    #[tokio::test]
    async fn finds_matches_with_line_numbers() {
        let (_dir, tool) = workspace();
        let result = tool
            .execute(serde_json::json!({"regex": "fn beta"}))
            .await
            .unwrap();
        assert_eq!(result.output, "src/lib.rs:2: fn beta() {}");
    }

    #[tokio::test]
    async fn include_and_exclude_globs_filter_files() {
        let (_dir, tool) = workspace();
        let result = tool
            .execute(serde_json::json!({
                "regex": "alpha",
                "include_pattern": "*.rs",
                "exclude_pattern": "*main.rs"
            }))
            .await
            .unwrap();
        assert_eq!(result.output, "src/lib.rs:1: pub fn alpha() {}");
    }

    #[tokio::test]
    async fn dependency_dirs_are_skipped() {
        let (_dir, tool) = workspace();
        let result = tool
            .execute(serde_json::json!({"regex": "alpha", "exclude_pattern": ""}))
            .await
            .unwrap();
        assert!(!result.output.contains("node_modules"));
        assert_eq!(result.output.lines().count(), 3);
    }

    #[tokio::test]
    async fn results_are_capped() {
        let dir = tempfile::tempdir().unwrap();
        let content: String = (0..80).map(|i| format!("hit {i}\n")).collect();
        std::fs::write(dir.path().join("many.txt"), content).unwrap();
        let tool = RegexSearchTool::new(WorkspaceRoot::new(dir.path()));
        let result = tool
            .execute(serde_json::json!({"regex": "^hit"}))
            .await
            .unwrap();
        assert_eq!(result.output.lines().count(), MAX_MATCHES);
    }

    #[tokio::test]
    async fn invalid_regex_is_reported() {
        let (_dir, tool) = workspace();
        let result = tool
            .execute(serde_json::json!({"regex": "(unclosed"}))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.output.starts_with("Invalid regex"));
    }

    #[tokio::test]
    async fn no_matches() {
        let (_dir, tool) = workspace();
        let result = tool
            .execute(serde_json::json!({"regex": "zeta"}))
            .await
            .unwrap();
        assert_eq!(result.output, "No matches found");
    }
}
