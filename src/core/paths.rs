//! core::paths
//!
//! Centralized path routing for namespaced storage.
//!
//! # Architecture
//!
//! Every subvolume, snapshot and file this crate touches lives under
//! `{root}/{namespace}`. Callers speak in logical, namespace-relative names
//! (`repoA/branches/master`); [`FsPaths`] is the only place that turns them
//! into absolute paths and back.
//!
//! **Hard rule:** no code outside this module joins the root and namespace
//! by hand.
//!
//! # Storage Layout
//!
//! ```text
//! {root}/{namespace}/
//!     {repo}/
//!         branches/{branch}            writable subvolume
//!         commits/{branch}-{timestamp} read-only snapshot
//! ```
//!
//! No traversal sanitization happens here. Names reaching this module are
//! validated types from [`crate::core::types`] or trusted internal strings.
//!
//! # Example
//!
//! ```
//! use snaprepo::core::paths::FsPaths;
//! use snaprepo::core::namespace::Namespace;
//! use std::path::{Path, PathBuf};
//!
//! let paths = FsPaths::new("/var/lib/pfs/vol", Namespace::new("ns").unwrap());
//! let abs = paths.file_path("repoA/commits");
//! assert_eq!(abs, PathBuf::from("/var/lib/pfs/vol/ns/repoA/commits"));
//! assert_eq!(paths.trim_file_path(&abs), Path::new("repoA/commits"));
//! ```

use std::path::{Component, Path, PathBuf};

use super::namespace::Namespace;
use super::types::{BranchName, CommitId, RepoName};

/// Directory holding a repository's branches.
pub const BRANCHES_DIR: &str = "branches";

/// Directory holding a repository's commits.
pub const COMMITS_DIR: &str = "commits";

/// Path resolver for one namespace under a storage root.
///
/// # Invariants
///
/// - `file_path(trim_file_path(file_path(x))) == file_path(x)` for every
///   logical name `x`
/// - The resolved path of the empty name is the namespace root itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsPaths {
    root: PathBuf,
    namespace: Namespace,
    /// `root.join(namespace)`, computed once.
    base: PathBuf,
}

impl FsPaths {
    /// Create a resolver for `namespace` under `root`.
    pub fn new(root: impl Into<PathBuf>, namespace: Namespace) -> Self {
        let root = root.into();
        let base = root.join(namespace.as_str());
        Self {
            root,
            namespace,
            base,
        }
    }

    /// The shared storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The namespace this resolver is scoped to.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// The namespace root, `{root}/{namespace}`.
    pub fn namespace_root(&self) -> &Path {
        &self.base
    }

    /// Resolve a logical name to an absolute path.
    ///
    /// Same as [`FsPaths::file_path`]; kept as a separate entry point for
    /// directory-style names.
    pub fn base_path(&self, name: impl AsRef<Path>) -> PathBuf {
        self.file_path(name)
    }

    /// Resolve a logical name to `{root}/{namespace}/{name}`.
    ///
    /// Root and prefix components of `name` are ignored, so `/a/b` and
    /// `a/b` resolve to the same place. `.` components are dropped.
    ///
    /// # Example
    ///
    /// ```
    /// use snaprepo::core::paths::FsPaths;
    /// use snaprepo::core::namespace::Namespace;
    /// use std::path::PathBuf;
    ///
    /// let paths = FsPaths::new("/vol", Namespace::new("ns").unwrap());
    /// assert_eq!(paths.file_path(""), PathBuf::from("/vol/ns"));
    /// assert_eq!(paths.file_path("/a/b"), PathBuf::from("/vol/ns/a/b"));
    /// ```
    pub fn file_path(&self, name: impl AsRef<Path>) -> PathBuf {
        let mut out = self.base.clone();
        for component in name.as_ref().components() {
            match component {
                Component::Normal(part) => out.push(part),
                Component::ParentDir => out.push(".."),
                Component::RootDir | Component::Prefix(_) | Component::CurDir => {}
            }
        }
        out
    }

    /// Strip the `{root}/{namespace}` prefix from `path`.
    ///
    /// Paths outside the namespace are returned unchanged. The namespace
    /// root itself trims to the empty path.
    pub fn trim_file_path<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.base).unwrap_or(path)
    }

    // =========================================================================
    // Repository layout (logical names)
    // =========================================================================

    /// Logical name of a repository subvolume.
    pub fn repo_dir(&self, repo: &RepoName) -> PathBuf {
        PathBuf::from(repo.as_str())
    }

    /// Logical name of `{repo}/branches`.
    pub fn branches_dir(&self, repo: &RepoName) -> PathBuf {
        self.repo_dir(repo).join(BRANCHES_DIR)
    }

    /// Logical name of `{repo}/branches/{branch}`.
    pub fn branch_path(&self, repo: &RepoName, branch: &BranchName) -> PathBuf {
        self.branches_dir(repo).join(branch.as_str())
    }

    /// Logical name of `{repo}/commits`.
    pub fn commits_dir(&self, repo: &RepoName) -> PathBuf {
        self.repo_dir(repo).join(COMMITS_DIR)
    }

    /// Logical name of `{repo}/commits/{commit}`.
    pub fn commit_path(&self, repo: &RepoName, commit: &CommitId) -> PathBuf {
        self.commits_dir(repo).join(commit.as_str())
    }
}
