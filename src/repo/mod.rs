//! repo
//!
//! Repositories, branches and commits on top of subvolumes.
//!
//! # Layout
//!
//! ```text
//! {repo}/                          subvolume
//!     branches/                    subvolume
//!         master/                  writable subvolume (working state)
//!         {branch}/
//!     commits/                     subvolume
//!         {branch}-{timestamp}/    read-only snapshot
//! ```
//!
//! # Operations
//!
//! - [`RepoStore::init`] - create the four-subvolume skeleton
//! - [`RepoStore::commit`] - read-only snapshot of a branch
//! - [`RepoStore::branch`] - writable snapshot of a commit
//! - [`RepoStore::log`] / [`RepoStore::log_entries`] - history, newest
//!   generation first
//! - [`RepoStore::send_commit`] / [`RepoStore::receive_commit`] -
//!   replication of commits between stores
//!
//! # Concurrency
//!
//! Nothing here locks. Commits on different branches touch disjoint
//! subtrees and may run in parallel. Two `branch` calls for the same name
//! race on the snapshot; exactly one wins and the other fails with an
//! already-exists error. Callers that need ordered commit/branch sequences
//! on one branch must serialize them themselves.

mod entry;
mod store;

pub use entry::{CommitEntry, InitReport};
pub use store::RepoStore;

use std::path::PathBuf;

use thiserror::Error;

use crate::btrfs::BtrfsError;
use crate::core::types::{CommitId, RepoName, TypeError};

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepoError {
    /// The repository skeleton is missing or incomplete.
    #[error("repository '{repo}' is not initialized (missing {missing})")]
    NotInitialized {
        /// The repository
        repo: RepoName,
        /// First missing part of the skeleton
        missing: PathBuf,
    },

    /// A received stream did not produce the expected commit.
    #[error("received stream did not create commit '{commit}'")]
    ReceiveMismatch {
        /// The commit the caller expected
        commit: CommitId,
    },

    #[error(transparent)]
    Btrfs(#[from] BtrfsError),

    #[error(transparent)]
    Type(#[from] TypeError),
}

impl RepoError {
    /// Whether the underlying failure was an already-exists precondition.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, RepoError::Btrfs(e) if e.is_already_exists())
    }

    /// Whether the underlying failure was a not-found precondition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepoError::Btrfs(e) if e.is_not_found())
    }

    /// Captured stderr of the tool, if one ran.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            RepoError::Btrfs(e) => e.stderr(),
            _ => None,
        }
    }
}
