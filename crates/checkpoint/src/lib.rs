//! # patchloop checkpoint
//!
//! Checkpoints of a workspace kept in a shadow git repository.
//!
//! The repository lives under a storage directory, at a path derived from a
//! hash of the workspace root, and its working tree *is* the workspace. The
//! project's own `.git` (if any) is never touched: every command pins
//! `--git-dir` and `--work-tree`.
//!
//! ```no_run
//! # async fn demo() -> patchloop_checkpoint::Result<()> {
//! use patchloop_checkpoint::CheckpointStore;
//! use std::path::Path;
//!
//! let store = CheckpointStore::open(Path::new("/tmp/checkpoints"), Path::new(".")).await?;
//! let hash = store.commit("before refactor").await?;
//! for commit in store.history(5).await? {
//!     println!("{} {}", commit.hash, commit.message);
//! }
//! store.restore_to_commit(&hash).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod excludes;
pub mod nested;
pub mod store;

pub use error::{CheckpointError, Result};
pub use nested::NestedReposHidden;
pub use store::{CheckpointCommit, CheckpointStore, FileDiff, repo_path_for};
