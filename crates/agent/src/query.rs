//! Turning the user's free text into the `user` message the loop sends.

use async_trait::async_trait;
use patchloop_core::workspace::WorkspaceFiles;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Directories [`WalkdirFiles`] never descends into.
const SKIPPED_DIRS: &[&str] = &[".git", ".git_tmp", "node_modules", "target", "dist", "build", ".venv"];

/// The fixed text put in front of every query.
pub fn preamble(workspace_root: &Path) -> String {
    format!(
        "Workspace root: {}\nAlways read a file before editing it.\n\n",
        workspace_root.display()
    )
}

/// Replace every whitespace-delimited `@name` token with the full path
/// `files` resolves it to. Unresolved tokens stay as typed.
pub async fn resolve_mentions(query: &str, files: &dyn WorkspaceFiles) -> String {
    let mut out = String::with_capacity(query.len());
    let mut rest = query;
    while !rest.is_empty() {
        let word_start = rest.find(|c: char| !c.is_whitespace()).unwrap_or(rest.len());
        out.push_str(&rest[..word_start]);
        rest = &rest[word_start..];

        let word_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let word = &rest[..word_end];
        let resolved = match word.strip_prefix('@').filter(|name| !name.is_empty()) {
            Some(name) => files.find(name).await,
            None => None,
        };
        match resolved {
            Some(path) => out.push_str(&path.to_string_lossy()),
            None => out.push_str(word),
        }
        rest = &rest[word_end..];
    }
    out
}

/// Preamble plus the query with its mentions resolved.
pub async fn prepare(query: &str, workspace_root: &Path, files: &dyn WorkspaceFiles) -> String {
    let mut prepared = preamble(workspace_root);
    prepared.push_str(&resolve_mentions(query, files).await);
    prepared
}

/// Finds workspace files by walking the tree.
///
/// A short name matches a file whose name equals it, or whose
/// workspace-relative path ends with it on a `/` boundary. The first match
/// in file-name order wins.
#[derive(Debug, Clone)]
pub struct WalkdirFiles {
    root: PathBuf,
}

impl WalkdirFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

fn is_skipped(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

fn find_in(root: &Path, short_name: &str) -> Option<PathBuf> {
    let wanted = short_name.trim_start_matches("./").replace('\\', "/");
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped(e))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .find(|e| {
            let relative = e
                .path()
                .strip_prefix(root)
                .unwrap_or(e.path())
                .to_string_lossy()
                .replace('\\', "/");
            relative == wanted || relative.ends_with(&format!("/{wanted}"))
        })
        .map(|e| e.into_path())
}

#[async_trait]
impl WorkspaceFiles for WalkdirFiles {
    async fn find(&self, short_name: &str) -> Option<PathBuf> {
        let root = self.root.clone();
        let short_name = short_name.to_string();
        tokio::task::spawn_blocking(move || find_in(&root, &short_name))
            .await
            .ok()
            .flatten()
    }
}
