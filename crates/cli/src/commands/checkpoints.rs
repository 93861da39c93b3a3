//! `patchloop history | diff | restore | checkpoint`: the checkpoint store
//! of one workspace.

use patchloop_tools::get_diff::render_unified;
use std::path::PathBuf;

pub async fn history(limit: usize, workspace: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let root = super::workspace_root(workspace)?;
    let store = super::open_store(&config, &root).await?;

    let commits = store.history(limit).await?;
    if commits.is_empty() {
        println!("No checkpoints yet for {}", root.display());
        return Ok(());
    }
    for commit in commits {
        let short = commit.hash.get(..10).unwrap_or(&commit.hash);
        println!("{short}  {}  {}", commit.date, commit.message);
    }
    Ok(())
}

pub async fn diff(
    from: &str,
    to: Option<&str>,
    workspace: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let root = super::workspace_root(workspace)?;
    let store = super::open_store(&config, &root).await?;

    let diffs = store.diff_set(from, to).await?;
    if diffs.is_empty() {
        println!("No changes");
        return Ok(());
    }
    for diff in &diffs {
        print!("{}", render_unified(diff));
    }
    Ok(())
}

pub async fn restore(hash: &str, workspace: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let root = super::workspace_root(workspace)?;
    let store = super::open_store(&config, &root).await?;

    store.restore_to_commit(hash).await?;
    println!("Restored {} to {hash}", root.display());
    Ok(())
}

pub async fn commit(message: &str, workspace: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let root = super::workspace_root(workspace)?;
    let store = super::open_store(&config, &root).await?;

    let hash = store.commit(message).await?;
    println!("{hash}");
    Ok(())
}
