//! Turning a parsed [`Patch`] into concrete file contents, and writing them.

use crate::error::PatchError;
use crate::parser::{ActionType, Chunk, Patch};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;

/// The computed effect of a patch on a single path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub kind: ActionType,
    pub old_content: Option<String>,
    pub new_content: Option<String>,
    pub move_path: Option<String>,
}

/// Every change a patch makes, keyed by original path, in patch order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Commit {
    pub changes: IndexMap<String, FileChange>,
}

impl Commit {
    /// Paths whose content ends up on disk or gets removed, including move
    /// targets.
    pub fn affected_paths(&self) -> Vec<&str> {
        let mut paths = Vec::new();
        for (path, change) in &self.changes {
            paths.push(path.as_str());
            if let Some(target) = &change.move_path {
                paths.push(target.as_str());
            }
        }
        paths
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// One line per change: `A path`, `M path`, `M old -> new`, `D path`.
impl fmt::Display for Commit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (path, change) in &self.changes {
            match (change.kind, &change.move_path) {
                (ActionType::Add, _) => writeln!(f, "A {path}")?,
                (ActionType::Delete, _) => writeln!(f, "D {path}")?,
                (ActionType::Update, Some(target)) => writeln!(f, "M {path} -> {target}")?,
                (ActionType::Update, None) => writeln!(f, "M {path}")?,
            }
        }
        Ok(())
    }
}

/// Compute the [`Commit`] for `patch` without touching anything.
pub fn build_commit(patch: &Patch, originals: &HashMap<String, String>) -> Result<Commit, PatchError> {
    let mut commit = Commit::default();
    for (path, action) in &patch.actions {
        let change = match action.kind {
            ActionType::Delete => FileChange {
                kind: ActionType::Delete,
                old_content: originals.get(path).cloned(),
                new_content: None,
                move_path: None,
            },
            ActionType::Add => {
                let Some(content) = &action.new_file else {
                    return Err(PatchError::MissingContent { path: path.clone() });
                };
                FileChange {
                    kind: ActionType::Add,
                    old_content: None,
                    new_content: Some(content.clone()),
                    move_path: None,
                }
            }
            ActionType::Update => {
                let Some(original) = originals.get(path) else {
                    return Err(PatchError::MissingFile { path: path.clone() });
                };
                FileChange {
                    kind: ActionType::Update,
                    old_content: Some(original.clone()),
                    new_content: Some(apply_chunks(original, &action.chunks, path)?),
                    move_path: action.move_path.clone(),
                }
            }
        };
        commit.changes.insert(path.clone(), change);
    }
    Ok(commit)
}

/// Splice `chunks` into `content`.
///
/// Chunks must be sorted by `orig_index` and must not overlap; a chunk that
/// starts before the end of the previous one, or past the end of the file,
/// is rejected.
pub fn apply_chunks(content: &str, chunks: &[Chunk], path: &str) -> Result<String, PatchError> {
    let orig_lines: Vec<&str> = content.split('\n').collect();
    let mut new_lines: Vec<&str> = Vec::with_capacity(orig_lines.len());
    let mut cursor = 0;

    for chunk in chunks {
        if chunk.orig_index > orig_lines.len() {
            return Err(PatchError::OutOfBounds {
                path: path.to_string(),
                index: chunk.orig_index,
            });
        }
        if cursor > chunk.orig_index {
            return Err(PatchError::OverlappingChunks {
                path: path.to_string(),
                cursor,
                index: chunk.orig_index,
            });
        }

        new_lines.extend_from_slice(&orig_lines[cursor..chunk.orig_index]);
        new_lines.extend(chunk.ins_lines.iter().map(String::as_str));
        cursor = (chunk.orig_index + chunk.del_lines.len()).min(orig_lines.len());
    }

    new_lines.extend_from_slice(&orig_lines[cursor..]);
    Ok(new_lines.join("\n"))
}

/// Write a computed commit through the injected functions.
///
/// Changes are applied in order. There is no rollback: when a write fails,
/// the files before it stay written.
pub fn apply_commit<W, R>(commit: &Commit, mut write: W, mut remove: R) -> Result<(), PatchError>
where
    W: FnMut(&str, &str) -> std::io::Result<()>,
    R: FnMut(&str) -> std::io::Result<()>,
{
    for (path, change) in &commit.changes {
        match change.kind {
            ActionType::Delete => {
                remove(path).map_err(|e| PatchError::io(path, e))?;
                tracing::debug!(path = %path, "patch removed file");
            }
            ActionType::Add | ActionType::Update => {
                let Some(content) = &change.new_content else {
                    return Err(PatchError::MissingContent { path: path.clone() });
                };
                let target = change.move_path.as_deref().unwrap_or(path);
                write(target, content).map_err(|e| PatchError::io(target, e))?;
                if change.move_path.is_some() {
                    remove(path).map_err(|e| PatchError::io(path, e))?;
                }
                tracing::debug!(path = %target, "patch wrote file");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn chunk(orig_index: usize, del: &[&str], ins: &[&str]) -> Chunk {
        Chunk {
            orig_index,
            del_lines: del.iter().map(|s| s.to_string()).collect(),
            ins_lines: ins.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn splices_in_order() {
        let out = apply_chunks(
            "1\n2\n3\n4\n5",
            &[chunk(1, &["2"], &["two"]), chunk(3, &["4"], &["four", "4b"])],
            "f",
        )
        .unwrap();
        assert_eq!(out, "1\ntwo\n3\nfour\n4b\n5");
    }

    #[test]
    fn decreasing_chunk_indices_are_rejected() {
        let content = (0..10).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        let err = apply_chunks(&content, &[chunk(5, &["5"], &["five"]), chunk(3, &["3"], &["three"])], "f")
            .unwrap_err();
        assert!(matches!(
            err,
            PatchError::OverlappingChunks { cursor: 6, index: 3, .. }
        ));
        assert!(err.to_string().contains("Overlapping chunks"));
    }

    #[test]
    fn chunk_past_end_is_rejected() {
        let err = apply_chunks("a\nb", &[chunk(7, &[], &["x"])], "f").unwrap_err();
        assert!(matches!(err, PatchError::OutOfBounds { index: 7, .. }));
    }

    #[test]
    fn insert_at_end_of_file() {
        let out = apply_chunks("a\nb", &[chunk(2, &[], &["c"])], "f").unwrap();
        assert_eq!(out, "a\nb\nc");
    }

    #[test]
    fn display_lists_changes() {
        let mut commit = Commit::default();
        commit.changes.insert(
            "a".into(),
            FileChange {
                kind: ActionType::Add,
                old_content: None,
                new_content: Some("x".into()),
                move_path: None,
            },
        );
        commit.changes.insert(
            "b".into(),
            FileChange {
                kind: ActionType::Update,
                old_content: Some("y".into()),
                new_content: Some("z".into()),
                move_path: Some("c".into()),
            },
        );
        assert_eq!(commit.to_string(), "A a\nM b -> c\n");
        assert_eq!(commit.affected_paths(), vec!["a", "b", "c"]);
    }

    #[test]
    fn missing_content_is_an_apply_error() {
        let mut commit = Commit::default();
        commit.changes.insert(
            "a".into(),
            FileChange {
                kind: ActionType::Add,
                old_content: None,
                new_content: None,
                move_path: None,
            },
        );
        let err = apply_commit(&commit, |_, _| Ok(()), |_| Ok(())).unwrap_err();
        assert_eq!(err.kind(), crate::PatchErrorKind::Apply);
    }

    #[test]
    fn failed_write_keeps_earlier_files() {
        let written = RefCell::new(Vec::new());
        let mut commit = Commit::default();
        for path in ["first", "second", "third"] {
            commit.changes.insert(
                path.into(),
                FileChange {
                    kind: ActionType::Add,
                    old_content: None,
                    new_content: Some(path.into()),
                    move_path: None,
                },
            );
        }

        let err = apply_commit(
            &commit,
            |path, _| {
                if path == "second" {
                    return Err(std::io::Error::other("disk full"));
                }
                written.borrow_mut().push(path.to_string());
                Ok(())
            },
            |_| Ok(()),
        )
        .unwrap_err();

        assert!(matches!(err, PatchError::Io { ref path, .. } if path == "second"));
        assert_eq!(*written.borrow(), vec!["first".to_string()]);
    }
}
