pub mod agent;
pub mod apply;
pub mod checkpoints;
pub mod config_cmd;

use patchloop_checkpoint::CheckpointStore;
use patchloop_config::AppConfig;
use std::path::PathBuf;

/// `--workspace`, or the current directory.
pub(crate) fn workspace_root(workspace: Option<PathBuf>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let root = match workspace {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    if !root.is_dir() {
        return Err(format!("Workspace is not a directory: {}", root.display()).into());
    }
    Ok(root.canonicalize()?)
}

pub(crate) fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// The checkpoint store of `root`, created on first use.
pub(crate) async fn open_store(
    config: &AppConfig,
    root: &std::path::Path,
) -> Result<CheckpointStore, Box<dyn std::error::Error>> {
    let store = CheckpointStore::open(&config.checkpoints.storage_dir(), root)
        .await
        .map_err(|e| format!("Failed to open checkpoints for {}: {e}", root.display()))?;
    Ok(store)
}
