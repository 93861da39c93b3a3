use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckpointError {
    /// The shadow repository belongs to a different workspace.
    #[error("History can only be used in the original workspace: {recorded} (current: {current})")]
    WorktreeMismatch { recorded: String, current: String },

    #[error("git {command} failed: {stderr}")]
    Git { command: String, stderr: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CheckpointError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CheckpointError>;
