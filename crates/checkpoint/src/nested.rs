//! Hiding nested git repositories while the shadow repository stages.
//!
//! A directory inside the workspace that has its own `.git` would be
//! recorded as a gitlink instead of its files. While a [`NestedReposHidden`]
//! guard is alive, every nested `.git` directory is renamed to `.git_tmp`.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Suffix appended to nested `.git` directories while they are hidden.
pub const HIDDEN_SUFFIX: &str = "_tmp";

/// Build and dependency directories the search never enters. They are
/// excluded from checkpoints anyway.
const PRUNED_DIRS: &[&str] = &[
    "node_modules",
    "target",
    "dist",
    "build",
    "__pycache__",
    ".venv",
    "venv",
];

/// Renames nested `.git` directories on creation and restores them on drop.
///
/// Renaming is best effort: a directory that cannot be moved is logged and
/// left where it is.
#[derive(Debug)]
pub struct NestedReposHidden {
    hidden: Vec<(PathBuf, PathBuf)>,
}

impl NestedReposHidden {
    pub fn new(workspace_root: &Path) -> Self {
        let mut hidden = Vec::new();
        for original in find_nested_git_dirs(workspace_root) {
            let mut name = original.clone().into_os_string();
            name.push(HIDDEN_SUFFIX);
            let renamed = PathBuf::from(name);
            match std::fs::rename(&original, &renamed) {
                Ok(()) => {
                    tracing::debug!(path = %original.display(), "disabled nested git repo");
                    hidden.push((original, renamed));
                }
                Err(e) => {
                    tracing::warn!(path = %original.display(), error = %e, "Failed to disable nested git repo");
                }
            }
        }
        Self { hidden }
    }

    /// [`NestedReposHidden::new`] on the blocking pool.
    pub async fn hide(workspace_root: &Path) -> Self {
        let root = workspace_root.to_path_buf();
        match tokio::task::spawn_blocking(move || Self::new(&root)).await {
            Ok(guard) => guard,
            Err(e) => {
                tracing::warn!(error = %e, "Nested repo scan did not complete");
                Self { hidden: Vec::new() }
            }
        }
    }

    /// Directories currently hidden, as `(original, renamed)` pairs.
    pub fn hidden(&self) -> &[(PathBuf, PathBuf)] {
        &self.hidden
    }
}

impl Drop for NestedReposHidden {
    fn drop(&mut self) {
        for (original, renamed) in self.hidden.drain(..) {
            match std::fs::rename(&renamed, &original) {
                Ok(()) => tracing::debug!(path = %original.display(), "enabled nested git repo"),
                Err(e) => {
                    tracing::warn!(path = %renamed.display(), error = %e, "Failed to enable nested git repo")
                }
            }
        }
    }
}

/// Every `.git` directory below `root`, excluding `root/.git` itself.
fn find_nested_git_dirs(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut walker = WalkDir::new(root).min_depth(1).into_iter();
    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        if entry
            .file_name()
            .to_str()
            .is_some_and(|name| PRUNED_DIRS.contains(&name))
        {
            walker.skip_current_dir();
            continue;
        }
        if entry.file_name() != ".git" {
            continue;
        }
        if entry.depth() > 1 {
            found.push(entry.path().to_path_buf());
        }
        walker.skip_current_dir();
    }
    found
}
