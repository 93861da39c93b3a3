//! `patchloop apply`: run the patch engine outside the agent.

use patchloop_tools::WorkspaceRoot;
use std::collections::HashMap;
use std::io::{self, Read};
use std::path::PathBuf;

pub async fn run(
    patch_file: &str,
    workspace: Option<PathBuf>,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = WorkspaceRoot::new(super::workspace_root(workspace)?);
    let text = read_patch(patch_file)?;

    let outcome = tokio::task::spawn_blocking(move || {
        if dry_run {
            validate(&root, &text)
        } else {
            apply(&root, &text)
        }
    })
    .await?;

    match outcome {
        Ok(commit) => {
            let verb = if dry_run { "Would apply" } else { "Applied" };
            println!("{verb} {} change(s):", commit.changes.len());
            print!("{commit}");
            Ok(())
        }
        Err(e) => Err(format!("Patch failed ({:?}): {e}", e.kind()).into()),
    }
}

fn read_patch(patch_file: &str) -> Result<String, Box<dyn std::error::Error>> {
    if patch_file == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    std::fs::read_to_string(patch_file)
        .map_err(|e| format!("Failed to read patch file {patch_file}: {e}").into())
}

fn resolve(root: &WorkspaceRoot, path: &str) -> io::Result<PathBuf> {
    root.resolve(path)
        .map_err(|e| io::Error::new(io::ErrorKind::PermissionDenied, e.to_string()))
}

fn apply(
    root: &WorkspaceRoot,
    text: &str,
) -> Result<patchloop_patch::Commit, patchloop_patch::PatchError> {
    patchloop_patch::apply_patch(
        text,
        |path| std::fs::read_to_string(resolve(root, path)?),
        |path, content| {
            let target = resolve(root, path)?;
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(target, content)
        },
        |path| std::fs::remove_file(resolve(root, path)?),
    )
}

/// Load what the patch references and validate it without writing.
fn validate(
    root: &WorkspaceRoot,
    text: &str,
) -> Result<patchloop_patch::Commit, patchloop_patch::PatchError> {
    let mut originals = HashMap::new();
    for path in patchloop_patch::referenced_paths(text) {
        let content = resolve(root, &path)
            .and_then(std::fs::read_to_string)
            .map_err(|e| patchloop_patch::PatchError::read(&path, e))?;
        originals.insert(path, content);
    }
    for path in patchloop_patch::added_paths(text) {
        if let Ok(existing) = resolve(root, &path).and_then(std::fs::read_to_string) {
            originals.entry(path).or_insert(existing);
        }
    }
    patchloop_patch::parse_and_validate(text, &originals)
}
