//! # patchloop patch
//!
//! The patch engine behind the `edit_file` tool.
//!
//! A patch looks like this:
//!
//! ```text
//! *** Begin Patch
//! *** Update File: src/main.rs
//! @@
//!  fn main() {
//! -    println!("hi");
//! +    println!("hello");
//!  }
//! *** Add File: NOTES.md
//! +# Notes
//! *** Delete File: old.txt
//! *** End Patch
//! ```
//!
//! Applying one happens in two phases. [`parse_and_validate`] is pure: it
//! locates every hunk and computes the full [`Commit`] or fails without side
//! effects. [`apply_commit`] then writes the result through injected
//! functions. [`apply_patch`] runs both, loading originals through `open`.

pub mod commit;
pub mod edits;
pub mod error;
pub mod parser;

pub use commit::{Commit, FileChange, apply_chunks, apply_commit, build_commit};
pub use edits::{EditBlock, apply_edits, parse_edit_blocks};
pub use error::{PatchError, PatchErrorKind};
pub use parser::{ActionType, Chunk, Patch, PatchAction, parse_patch};

use parser::{ADD_FILE, BEGIN_PATCH, DELETE_FILE, UPDATE_FILE, extract_paths};
use std::collections::HashMap;

/// Paths whose original content must be loaded before parsing: every
/// Update and Delete target.
pub fn referenced_paths(text: &str) -> Vec<String> {
    let mut paths = extract_paths(text, UPDATE_FILE);
    paths.extend(extract_paths(text, DELETE_FILE));
    paths
}

/// Paths the patch creates.
pub fn added_paths(text: &str) -> Vec<String> {
    extract_paths(text, ADD_FILE)
}

/// Parse `text` and compute its effect on `originals` without side effects.
pub fn parse_and_validate(
    text: &str,
    originals: &HashMap<String, String>,
) -> Result<Commit, PatchError> {
    if !text.starts_with(BEGIN_PATCH) {
        return Err(PatchError::InvalidStart);
    }
    let patch = parse_patch(text, originals)?;
    build_commit(&patch, originals)
}

/// Load, validate and write a patch.
///
/// `open` is called for every Update/Delete target (its errors abort before
/// anything is written, as format errors) and for every Add target, where success means the
/// file already exists. Returns the commit that was written.
pub fn apply_patch<O, W, R>(text: &str, mut open: O, write: W, remove: R) -> Result<Commit, PatchError>
where
    O: FnMut(&str) -> std::io::Result<String>,
    W: FnMut(&str, &str) -> std::io::Result<()>,
    R: FnMut(&str) -> std::io::Result<()>,
{
    if !text.starts_with(BEGIN_PATCH) {
        return Err(PatchError::InvalidStart);
    }

    let mut originals = HashMap::new();
    for path in referenced_paths(text) {
        let content = open(&path).map_err(|e| PatchError::read(&path, e))?;
        originals.insert(path, content);
    }
    for path in added_paths(text) {
        if let Ok(existing) = open(&path) {
            originals.entry(path).or_insert(existing);
        }
    }

    let commit = parse_and_validate(text, &originals)?;
    apply_commit(&commit, write, remove)?;
    tracing::info!(files = commit.changes.len(), "patch applied");
    Ok(commit)
}
