//! These tests drive a real `git` binary against temporary workspaces.

use patchloop_checkpoint::{CheckpointError, CheckpointStore, repo_path_for};
use std::path::Path;
use tempfile::TempDir;

struct Fixture {
    storage: TempDir,
    workspace: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            storage: tempfile::tempdir().expect("storage dir"),
            workspace: tempfile::tempdir().expect("workspace dir"),
        }
    }

    fn write(&self, rel: &str, content: &str) {
        let path = self.workspace.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(path, content).expect("write");
    }

    fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.workspace.path().join(rel)).expect("read")
    }

    async fn open(&self) -> CheckpointStore {
        CheckpointStore::open(self.storage.path(), self.workspace.path())
            .await
            .expect("open store")
    }
}

#[tokio::test]
async fn commit_history_and_diff_round_trip() {
    let fx = Fixture::new();
    let store = fx.open().await;

    fx.write("F", "a");
    store.add_changes().await.expect("stage");
    let m1 = store.commit("m1").await.expect("commit m1");

    fx.write("F", "b");
    let m2 = store.commit("m2").await.expect("commit m2");

    let history = store.history(2).await.expect("history");
    let messages: Vec<&str> = history.iter().map(|c| c.message.as_str()).collect();
    assert_eq!(messages, vec!["m2", "m1"]);
    assert_eq!(history[0].hash, m2);
    assert_eq!(history[1].hash, m1);
    assert_eq!(history[0].author, "patchloop checkpoints");
    assert!(!history[0].date.is_empty());

    let diff = store.diff_set(&m1, Some(&m2)).await.expect("diff");
    assert_eq!(diff.len(), 1);
    assert_eq!(diff[0].relative_path, "F");
    assert_eq!(diff[0].before, "a");
    assert_eq!(diff[0].after, "b");
}

#[tokio::test]
async fn reopening_with_a_different_workspace_is_rejected() {
    let storage = tempfile::tempdir().expect("storage");
    let a = tempfile::tempdir().expect("workspace a");
    let b = tempfile::tempdir().expect("workspace b");

    let store = CheckpointStore::open(storage.path(), a.path())
        .await
        .expect("open for A");
    let repo_a = store.repo_path().to_path_buf();
    drop(store);

    // Put A's repository where B's would be looked up
    let repo_b = repo_path_for(storage.path(), b.path());
    std::fs::rename(&repo_a, &repo_b).expect("relocate repo");

    let err = CheckpointStore::open(storage.path(), b.path())
        .await
        .expect_err("mismatched worktree");
    assert!(matches!(err, CheckpointError::WorktreeMismatch { .. }));
}

#[tokio::test]
async fn existing_files_get_an_initial_commit() {
    let fx = Fixture::new();
    fx.write("src/main.rs", "fn main() {}\n");
    let store = fx.open().await;

    let history = store.history(10).await.expect("history");
    assert_eq!(history.len(), 1);
    assert!(!store.has_changes().await.expect("status"));
}

#[tokio::test]
async fn empty_workspace_has_no_history() {
    let fx = Fixture::new();
    let store = fx.open().await;
    assert!(store.history(5).await.expect("history").is_empty());
}

#[tokio::test]
async fn reopening_the_same_workspace_reuses_the_repo() {
    let fx = Fixture::new();
    fx.write("a.txt", "1");
    let first = fx.open().await;
    let hash = first.commit("one").await.expect("commit");

    let second = fx.open().await;
    assert_eq!(first.repo_path(), second.repo_path());
    let history = second.history(1).await.expect("history");
    assert_eq!(history[0].hash, hash);
}

#[tokio::test]
async fn diff_against_working_tree_reads_disk() {
    let fx = Fixture::new();
    fx.write("kept.txt", "same");
    fx.write("gone.txt", "bye");
    let store = fx.open().await;
    let base = store.commit("base").await.expect("commit");

    fx.write("kept.txt", "changed");
    fx.write("new.txt", "hello");
    std::fs::remove_file(fx.workspace.path().join("gone.txt")).expect("rm");

    let mut diff = store.diff_set(&base, None).await.expect("diff");
    diff.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    let summary: Vec<(&str, &str, &str)> = diff
        .iter()
        .map(|d| (d.relative_path.as_str(), d.before.as_str(), d.after.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("gone.txt", "bye", ""),
            ("kept.txt", "same", "changed"),
            ("new.txt", "", "hello"),
        ]
    );
}

#[tokio::test]
async fn restore_overwrites_live_files() {
    let fx = Fixture::new();
    fx.write("config.toml", "v = 1");
    let store = fx.open().await;
    let good = store.commit("good").await.expect("commit");

    fx.write("config.toml", "v = 2");
    store.commit("bad").await.expect("commit");

    store.restore_to_commit(&good).await.expect("restore");
    assert_eq!(fx.read("config.toml"), "v = 1");
}

#[tokio::test]
async fn nested_repositories_are_snapshotted_as_files() {
    let fx = Fixture::new();
    fx.write("vendored/lib.rs", "pub fn v() {}");
    std::fs::create_dir_all(fx.workspace.path().join("vendored/.git")).expect("nested .git");
    let store = fx.open().await;

    fx.write("vendored/lib.rs", "pub fn v2() {}");
    let before = store.history(1).await.expect("history")[0].hash.clone();
    let after = store.commit("vendored change").await.expect("commit");

    let diff = store.diff_set(&before, Some(&after)).await.expect("diff");
    assert_eq!(diff.len(), 1);
    assert_eq!(diff[0].relative_path, "vendored/lib.rs");
    assert!(Path::new(&fx.workspace.path().join("vendored/.git")).is_dir());
    assert!(!fx.workspace.path().join("vendored/.git_tmp").exists());
}

#[tokio::test]
async fn excluded_files_never_enter_history() {
    let fx = Fixture::new();
    fx.write("app.log", "noise");
    fx.write("node_modules/dep/index.js", "x");
    fx.write("main.py", "print()");
    let store = fx.open().await;

    let exclude = std::fs::read_to_string(store.repo_path().join("info/exclude")).expect("exclude");
    assert!(exclude.lines().any(|l| l == "node_modules/"));

    fx.write("main.py", "print(1)");
    fx.write("app.log", "more noise");
    let first = store.history(1).await.expect("history")[0].hash.clone();
    let second = store.commit("edit").await.expect("commit");
    let diff = store.diff_set(&first, Some(&second)).await.expect("diff");
    let paths: Vec<&str> = diff.iter().map(|d| d.relative_path.as_str()).collect();
    assert_eq!(paths, vec!["main.py"]);
}
