//! The shadow repository itself.

use crate::error::{CheckpointError, Result};
use crate::excludes::write_excludes_file;
use crate::nested::NestedReposHidden;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::process::Command;

const BOT_NAME: &str = "patchloop checkpoints";
const BOT_EMAIL: &str = "checkpoints@patchloop.local";
const INITIAL_MESSAGE: &str = "Add files";

/// One entry of [`CheckpointStore::history`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointCommit {
    pub hash: String,
    pub message: String,
    /// Author date, ISO 8601
    pub date: String,
    pub author: String,
}

/// One changed file in a [`CheckpointStore::diff_set`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    /// Path relative to the workspace root, `/`-separated
    pub relative_path: String,
    pub absolute_path: PathBuf,
    /// Content on the `from` side, empty if the file did not exist
    pub before: String,
    /// Content on the `to` side (or on disk), empty if the file did not exist
    pub after: String,
}

/// Where the shadow repository for `workspace_root` lives under `base`.
///
/// The directory name is the SHA-256 of the canonical workspace path, so it
/// is stable across sessions.
pub fn repo_path_for(base: &Path, workspace_root: &Path) -> PathBuf {
    let canonical = canonical_root(workspace_root);
    let digest = Sha256::digest(canonical.to_string_lossy().as_bytes());
    base.join(hex::encode(digest))
}

fn canonical_root(root: &Path) -> PathBuf {
    root.canonicalize().unwrap_or_else(|_| root.to_path_buf())
}

/// A git repository, stored outside the workspace, whose working tree is
/// the workspace.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    repo: PathBuf,
    root: PathBuf,
}

impl CheckpointStore {
    /// Open the shadow repository for `workspace_root`, creating it on first
    /// use.
    ///
    /// A new repository gets the bot identity, signing disabled, the excludes
    /// file, and an initial commit of everything present. An existing one
    /// must have been created for this same workspace.
    pub async fn open(base: &Path, workspace_root: &Path) -> Result<Self> {
        let root = canonical_root(workspace_root);
        let repo = repo_path_for(base, &root);
        tokio::fs::create_dir_all(&repo)
            .await
            .map_err(|e| CheckpointError::io(&repo, e))?;

        let store = Self { repo, root };
        if store.repo.join("HEAD").exists() {
            store.verify_worktree().await?;
            tracing::info!(repo = %store.repo.display(), "Using existing shadow git");
            write_excludes_file(&store.repo, &store.root).await?;
        } else {
            store.initialize().await?;
        }
        Ok(store)
    }

    async fn initialize(&self) -> Result<()> {
        self.git(&["init", "--quiet"]).await?;
        let worktree = self.root.to_string_lossy().into_owned();
        for (key, value) in [
            ("core.bare", "false"),
            ("core.worktree", worktree.as_str()),
            ("commit.gpgSign", "false"),
            ("user.name", BOT_NAME),
            ("user.email", BOT_EMAIL),
        ] {
            self.git(&["config", key, value]).await?;
        }
        write_excludes_file(&self.repo, &self.root).await?;
        tracing::info!(repo = %self.repo.display(), root = %self.root.display(), "Created shadow git");

        // A workspace that cannot be staged still gets a usable store
        let initial = async {
            self.add_changes().await?;
            if self.has_changes().await? {
                self.git(&["commit", "--quiet", "--no-verify", "-m", INITIAL_MESSAGE])
                    .await?;
            }
            Ok::<_, CheckpointError>(())
        };
        if let Err(e) = initial.await {
            tracing::error!(error = %e, "Failed to add files to history");
        }
        Ok(())
    }

    async fn verify_worktree(&self) -> Result<()> {
        let recorded = self
            .git(&["config", "--get", "core.worktree"])
            .await
            .unwrap_or_default();
        let recorded = recorded.trim();
        let current = self.root.to_string_lossy();
        if recorded != current {
            return Err(CheckpointError::WorktreeMismatch {
                recorded: recorded.to_string(),
                current: current.into_owned(),
            });
        }
        Ok(())
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo
    }

    pub fn workspace_root(&self) -> &Path {
        &self.root
    }

    /// Stage every change in the working tree with nested repositories
    /// hidden.
    pub async fn add_changes(&self) -> Result<()> {
        let _hidden = NestedReposHidden::hide(&self.root).await;
        self.git(&["add", "--all"]).await.map(|_| ())
    }

    /// Whether anything differs from the last commit (staged or not).
    pub async fn has_changes(&self) -> Result<bool> {
        let _hidden = NestedReposHidden::hide(&self.root).await;
        let status = self.git(&["status", "--porcelain"]).await?;
        Ok(!status.trim().is_empty())
    }

    /// Stage and commit everything; returns the new commit hash.
    ///
    /// Commits even when nothing changed, and never runs hooks.
    pub async fn commit(&self, message: &str) -> Result<String> {
        self.add_changes().await?;
        self.git(&["commit", "--quiet", "--allow-empty", "--no-verify", "-m", message])
            .await?;
        let hash = self.git(&["rev-parse", "HEAD"]).await?.trim().to_string();
        tracing::info!(hash = %hash, message = %message, "Checkpoint commit created");
        Ok(hash)
    }

    /// The most recent `limit` commits, newest first.
    pub async fn history(&self, limit: usize) -> Result<Vec<CheckpointCommit>> {
        if !self.has_head().await {
            return Ok(Vec::new());
        }
        let limit = limit.to_string();
        let log = self
            .git(&["log", "-n", &limit, "--format=%H%x1f%aI%x1f%an%x1f%s%x1e"])
            .await?;
        Ok(parse_log(&log))
    }

    /// Every file that differs between `from` and `to` (or the working tree
    /// when `to` is `None`), with full contents on both sides.
    pub async fn diff_set(&self, from: &str, to: Option<&str>) -> Result<Vec<FileDiff>> {
        self.add_changes().await?;

        let mut args = vec!["diff", "--name-only", "--no-renames", "-z", from];
        if let Some(to) = to {
            args.push(to);
        }
        let names = {
            let _hidden = NestedReposHidden::hide(&self.root).await;
            self.git(&args).await?
        };

        let mut result = Vec::new();
        for relative_path in names.split('\0').filter(|p| !p.is_empty()) {
            let absolute_path = self.root.join(relative_path);
            let before = self.show(from, relative_path).await;
            let after = match to {
                Some(to) => self.show(to, relative_path).await,
                None => tokio::fs::read_to_string(&absolute_path)
                    .await
                    .unwrap_or_default(),
            };
            result.push(FileDiff {
                relative_path: relative_path.to_string(),
                absolute_path,
                before,
                after,
            });
        }
        Ok(result)
    }

    /// Hard-reset the workspace to `hash`. Live files are overwritten.
    pub async fn restore_to_commit(&self, hash: &str) -> Result<()> {
        let _hidden = NestedReposHidden::hide(&self.root).await;
        self.git(&["reset", "--hard", "--quiet", hash]).await?;
        tracing::info!(hash = %hash, "Workspace restored");
        Ok(())
    }

    /// File content at `rev`, or empty when it does not exist there.
    async fn show(&self, rev: &str, path: &str) -> String {
        let spec = format!("{rev}:{path}");
        self.git(&["show", &spec]).await.unwrap_or_default()
    }

    async fn has_head(&self) -> bool {
        self.git(&["rev-parse", "--verify", "--quiet", "HEAD"])
            .await
            .is_ok()
    }

    /// Run git against this repository and return its stdout.
    async fn git(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .arg("--git-dir")
            .arg(&self.repo)
            .arg("--work-tree")
            .arg(&self.root)
            .args(args)
            .current_dir(&self.root)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .await
            .map_err(|e| CheckpointError::io(&self.root, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::debug!(args = ?args, stderr = %stderr, "git command failed");
            return Err(CheckpointError::Git {
                command: args.join(" "),
                stderr,
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Parse `git log` output written with `%x1f` field and `%x1e` record
/// separators.
fn parse_log(log: &str) -> Vec<CheckpointCommit> {
    log.split('\u{1e}')
        .map(str::trim)
        .filter(|record| !record.is_empty())
        .filter_map(|record| {
            let mut fields = record.split('\u{1f}');
            Some(CheckpointCommit {
                hash: fields.next()?.to_string(),
                date: fields.next()?.to_string(),
                author: fields.next()?.to_string(),
                message: fields.next().unwrap_or_default().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_path_is_stable_and_per_workspace() {
        let base = Path::new("/var/checkpoints");
        let a = repo_path_for(base, Path::new("/nonexistent/a"));
        assert_eq!(a, repo_path_for(base, Path::new("/nonexistent/a")));
        assert_ne!(a, repo_path_for(base, Path::new("/nonexistent/b")));
        assert!(a.starts_with(base));
        assert_eq!(a.file_name().map(|n| n.len()), Some(64));
    }

    #[test]
    fn log_records_are_split() {
        let log = "h2\u{1f}2026-01-02T00:00:00+00:00\u{1f}bot\u{1f}second\u{1e}\n\
                   h1\u{1f}2026-01-01T00:00:00+00:00\u{1f}bot\u{1f}first\u{1e}\n";
        let commits = parse_log(log);
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].hash, "h2");
        assert_eq!(commits[0].message, "second");
        assert_eq!(commits[1].author, "bot");
    }
}
