//! Tests against a real btrfs filesystem.
//!
//! Enabled with `--features live_btrfs_tests`. `SNAPREPO_LIVE_ROOT` must
//! name a writable directory on a btrfs mount, and the `btrfs` tool must be
//! usable by the test user (typically root). Each test works in its own
//! random namespace and deletes it afterwards.

#![cfg(all(unix, feature = "live_btrfs_tests"))]

use std::io::{Cursor, Read};
use std::path::PathBuf;

use snaprepo::core::config::{Config, EngineConfig};
use snaprepo::core::types::{BranchName, Generation, RepoName};
use snaprepo::repo::RepoStore;

const ENV_ROOT: &str = "SNAPREPO_LIVE_ROOT";

fn live_root() -> PathBuf {
    std::env::var_os(ENV_ROOT)
        .map(PathBuf::from)
        .unwrap_or_else(|| panic!("{} must point at a btrfs directory", ENV_ROOT))
}

/// A store in a fresh random namespace, removed on drop.
struct LiveStore {
    store: RepoStore,
    repos: Vec<RepoName>,
}

impl LiveStore {
    fn new() -> Self {
        let config = Config::from_engine_config(EngineConfig {
            root: Some(live_root()),
            namespace: Some("snaprepo-test-".to_string()),
            random_suffix: Some(true),
            ..EngineConfig::default()
        })
        .unwrap();
        let store = RepoStore::open(config.build().unwrap()).unwrap();
        Self {
            store,
            repos: Vec::new(),
        }
    }

    fn init(&mut self, name: &str) -> RepoName {
        let repo = RepoName::new(name).unwrap();
        self.store.init(&repo).unwrap();
        self.repos.push(repo.clone());
        repo
    }
}

impl Drop for LiveStore {
    fn drop(&mut self) {
        // Nested subvolumes must go before their parents.
        for repo in &self.repos {
            if let Ok(log) = self.store.log_entries(repo, Generation::ZERO) {
                for entry in log {
                    let _ = self.store.delete_commit(repo, &entry.id);
                }
            }
            if let Ok(branches) = self.store.list_branches(repo) {
                for branch in branches {
                    let _ = self.store.delete_branch(repo, &branch);
                }
            }
            let btrfs = self.store.btrfs();
            let paths = btrfs.paths();
            let _ = btrfs.subvolume_delete(paths.commits_dir(repo));
            let _ = btrfs.subvolume_delete(paths.branches_dir(repo));
            let _ = btrfs.subvolume_delete(paths.repo_dir(repo));
        }
        let _ = self.store.btrfs().subvolume_delete("");
    }
}

#[test]
fn commit_log_and_branch() {
    let mut live = LiveStore::new();
    let repo = live.init("repo");
    let store = &live.store;
    let master = BranchName::master();

    std::fs::write(store.branch_dir(&repo, &master).join("f"), "one").unwrap();
    let c1 = store.commit(&repo, &master).unwrap();
    std::fs::write(store.branch_dir(&repo, &master).join("f"), "two").unwrap();
    let c2 = store.commit(&repo, &master).unwrap();

    let log = store.log_entries(&repo, Generation::ZERO).unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].id, c2);
    assert_eq!(log[1].id, c1);

    let dev = BranchName::new("dev").unwrap();
    store.branch(&repo, &c1, &dev).unwrap();
    assert_eq!(
        std::fs::read_to_string(store.branch_dir(&repo, &dev).join("f")).unwrap(),
        "one"
    );
    assert!(store.branch(&repo, &c1, &master).unwrap_err().is_already_exists());
}

#[test]
fn send_and_receive_between_repos() {
    let mut live = LiveStore::new();
    let src = live.init("src");
    let dst = live.init("dst");
    let store = &live.store;
    let master = BranchName::master();

    std::fs::write(store.branch_dir(&src, &master).join("f"), "payload").unwrap();
    let c1 = store.commit(&src, &master).unwrap();

    let stream = store
        .send_commit(&src, &c1, None, |r| {
            let mut buf = Vec::new();
            r.read_to_end(&mut buf)?;
            Ok(buf)
        })
        .unwrap();
    store.receive_commit(&dst, &c1, Cursor::new(stream)).unwrap();

    assert_eq!(
        std::fs::read_to_string(store.commit_dir(&dst, &c1).join("f")).unwrap(),
        "payload"
    );
}
