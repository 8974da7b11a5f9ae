//! Shared fixtures for integration tests.
//!
//! [`FakeFs`] lays out a storage root backed by `fake-btrfs.sh`, which
//! emulates the snapshot tool with plain directories and a tar-based send
//! stream. Each fixture is its own "filesystem", so two fixtures stand in
//! for two hosts in replication tests.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use snaprepo::btrfs::Btrfs;
use snaprepo::core::config::{Config, EngineConfig};
use snaprepo::files::NamespacedFiles;
use snaprepo::repo::RepoStore;

/// A fake btrfs filesystem in a temp dir.
pub struct FakeFs {
    dir: TempDir,
}

impl FakeFs {
    /// Create the storage root.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        fs::create_dir_all(dir.path().join("vol/.fake-btrfs")).unwrap();
        Self { dir }
    }

    /// Storage root.
    pub fn root(&self) -> PathBuf {
        self.dir.path().join("vol")
    }

    /// Path of the fake tool.
    pub fn tool(&self) -> PathBuf {
        fake_tool()
    }

    /// Configuration for `namespace` on this filesystem.
    pub fn config(&self, namespace: &str) -> Config {
        Config::from_engine_config(EngineConfig {
            root: Some(self.root()),
            namespace: Some(namespace.to_string()),
            tool: Some(self.tool().to_string_lossy().into_owned()),
            ..EngineConfig::default()
        })
        .expect("valid test config")
    }

    /// Tool handle for `namespace`, without bootstrapping it.
    pub fn btrfs(&self, namespace: &str) -> Btrfs {
        self.config(namespace).build().expect("valid test paths")
    }

    /// Store for `namespace` with the namespace bootstrapped.
    pub fn store(&self, namespace: &str) -> RepoStore {
        RepoStore::open(self.btrfs(namespace)).expect("failed to bootstrap namespace")
    }

    /// File access for `namespace`.
    pub fn files(&self, namespace: &str) -> NamespacedFiles {
        NamespacedFiles::new(self.btrfs(namespace).paths().clone())
    }
}

/// The fake tool script, made executable in place.
///
/// Executed from the source tree rather than copied: writing an executable
/// while other test threads fork can fail its exec with "text file busy".
pub fn fake_tool() -> PathBuf {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/support/fake-btrfs.sh");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
        .expect("failed to mark fake tool executable");
    path
}

/// Read a file to a string.
pub fn read(path: impl AsRef<Path>) -> String {
    fs::read_to_string(path.as_ref())
        .unwrap_or_else(|e| panic!("failed to read {}: {}", path.as_ref().display(), e))
}
