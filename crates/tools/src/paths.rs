//! Path confinement: file tools may only touch paths inside the workspace.
//!
//! Relative paths resolve against the workspace root. `..` components are
//! folded lexically, and anything that lands outside the root (including
//! through a symlink) is rejected.

use std::path::{Component, Path, PathBuf};

/// Error returned when a tool path cannot be used.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("No path given")]
    Empty,

    #[error("Path traversal detected in '{path}'")]
    PathTraversal { path: String },

    #[error("Path '{path}' is outside the workspace")]
    OutsideWorkspace { path: String },
}

/// The canonical workspace root every tool resolves against.
#[derive(Debug, Clone)]
pub struct WorkspaceRoot {
    root: PathBuf,
}

impl WorkspaceRoot {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            root: root.canonicalize().unwrap_or_else(|_| root.to_path_buf()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Resolve `path` to an absolute path inside the workspace.
    ///
    /// The target does not need to exist. When it (or its closest existing
    /// ancestor) does, symlinks are followed before the containment check.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, PathError> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(PathError::Empty);
        }

        let input = Path::new(trimmed);
        let joined = if input.is_absolute() {
            input.to_path_buf()
        } else {
            self.root.join(input)
        };

        let normalized = normalize(&joined).ok_or_else(|| PathError::PathTraversal {
            path: path.to_string(),
        })?;
        if !normalized.starts_with(&self.root) {
            return Err(PathError::OutsideWorkspace {
                path: path.to_string(),
            });
        }

        let real = canonicalize_existing_prefix(&normalized);
        if !real.starts_with(&self.root) {
            return Err(PathError::OutsideWorkspace {
                path: path.to_string(),
            });
        }
        Ok(normalized)
    }

    /// `absolute` relative to the root, `/`-separated. Paths outside the
    /// root are returned as given.
    pub fn relative(&self, absolute: &Path) -> String {
        absolute
            .strip_prefix(&self.root)
            .unwrap_or(absolute)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

/// Fold `.` and `..` without touching the filesystem. `None` when `..`
/// climbs above the filesystem root.
fn normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    Some(out)
}

/// Canonicalize the longest existing ancestor of `path` and re-append the
/// rest.
fn canonicalize_existing_prefix(path: &Path) -> PathBuf {
    let mut existing = path.to_path_buf();
    let mut rest = Vec::new();
    while !existing.exists() {
        match (existing.file_name(), existing.parent()) {
            (Some(name), Some(parent)) => {
                rest.push(name.to_os_string());
                existing = parent.to_path_buf();
            }
            _ => return path.to_path_buf(),
        }
    }
    let mut real = existing.canonicalize().unwrap_or(existing);
    for name in rest.into_iter().rev() {
        real.push(name);
    }
    real
}
