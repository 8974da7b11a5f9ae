//! repo::store
//!
//! [`RepoStore`]: repository operations over one namespace.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::entry::{CommitEntry, InitReport};
use super::RepoError;
use crate::btrfs::{Btrfs, BtrfsError, PathError};
use crate::core::naming::CommitClock;
use crate::core::types::{BranchName, CommitId, Generation, RepoName};

/// Repository operations over one namespace.
///
/// Owns the [`Btrfs`] handle and the [`CommitClock`] that names commits.
/// Every operation except [`RepoStore::init`] first checks that the
/// repository skeleton is in place and fails with
/// [`RepoError::NotInitialized`] otherwise.
#[derive(Debug)]
pub struct RepoStore {
    btrfs: Btrfs,
    clock: CommitClock,
}

impl RepoStore {
    /// Create a store using the system clock.
    pub fn new(btrfs: Btrfs) -> Self {
        Self::with_clock(btrfs, CommitClock::system())
    }

    /// Create a store with an explicit commit clock.
    pub fn with_clock(btrfs: Btrfs, clock: CommitClock) -> Self {
        Self { btrfs, clock }
    }

    /// Create a store and bootstrap its namespace.
    pub fn open(btrfs: Btrfs) -> Result<Self, RepoError> {
        btrfs.ensure_namespace()?;
        Ok(Self::new(btrfs))
    }

    /// The underlying tool handle.
    pub fn btrfs(&self) -> &Btrfs {
        &self.btrfs
    }

    /// Absolute path of a branch's working directory.
    pub fn branch_dir(&self, repo: &RepoName, branch: &BranchName) -> PathBuf {
        let paths = self.btrfs.paths();
        paths.file_path(paths.branch_path(repo, branch))
    }

    /// Absolute path of a commit's snapshot.
    pub fn commit_dir(&self, repo: &RepoName, commit: &CommitId) -> PathBuf {
        let paths = self.btrfs.paths();
        paths.file_path(paths.commit_path(repo, commit))
    }

    fn skeleton(&self, repo: &RepoName) -> [PathBuf; 4] {
        let paths = self.btrfs.paths();
        [
            paths.repo_dir(repo),
            paths.branches_dir(repo),
            paths.branch_path(repo, &BranchName::master()),
            paths.commits_dir(repo),
        ]
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Create the repository skeleton.
    ///
    /// Parts that already exist are left alone, so a retry after a partial
    /// failure completes the skeleton. Calling this on a complete repository
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// - [`crate::btrfs::PathError::ParentMissing`] if the namespace root
    ///   is absent
    /// - any tool failure creating a missing part
    pub fn init(&self, repo: &RepoName) -> Result<InitReport, RepoError> {
        let mut report = InitReport::default();
        for part in self.skeleton(repo) {
            if self.btrfs.exists(&part)? {
                report.existing.push(part);
                continue;
            }
            match self.btrfs.subvolume_create(&part) {
                Ok(()) => report.created.push(part),
                // Created by someone else between the check and the call.
                Err(e) if e.is_already_exists() => report.existing.push(part),
                Err(e) => return Err(e.into()),
            }
        }
        info!(
            repo = %repo,
            created = report.created.len(),
            existing = report.existing.len(),
            "initialized repository"
        );
        Ok(report)
    }

    /// Whether all four parts of the skeleton exist.
    pub fn is_initialized(&self, repo: &RepoName) -> Result<bool, RepoError> {
        Ok(self.missing_part(repo)?.is_none())
    }

    fn missing_part(&self, repo: &RepoName) -> Result<Option<PathBuf>, RepoError> {
        for part in self.skeleton(repo) {
            if !self.btrfs.exists(&part)? {
                return Ok(Some(part));
            }
        }
        Ok(None)
    }

    fn require_initialized(&self, repo: &RepoName) -> Result<(), RepoError> {
        match self.missing_part(repo)? {
            None => Ok(()),
            Some(missing) => Err(RepoError::NotInitialized {
                repo: repo.clone(),
                missing,
            }),
        }
    }

    // =========================================================================
    // Commits and branches
    // =========================================================================

    /// Take a read-only snapshot of `branch` as a new commit.
    ///
    /// The commit is named `{branch}-{timestamp}`; timestamps issued by
    /// this store are strictly increasing.
    ///
    /// # Errors
    ///
    /// - [`RepoError::NotInitialized`] if the repository is incomplete
    /// - not-found if `branch` does not exist
    /// - already-exists if another process took the same name
    pub fn commit(&self, repo: &RepoName, branch: &BranchName) -> Result<CommitId, RepoError> {
        self.require_initialized(repo)?;
        let paths = self.btrfs.paths();
        let id = self.clock.commit_id(branch);
        self.btrfs.snapshot(
            paths.branch_path(repo, branch),
            paths.commit_path(repo, &id),
            true,
        )?;
        info!(repo = %repo, branch = %branch, commit = %id, "committed");
        Ok(id)
    }

    /// Create a writable branch from `commit`.
    ///
    /// # Errors
    ///
    /// - [`RepoError::NotInitialized`] if the repository is incomplete
    /// - not-found if `commit` does not exist
    /// - already-exists if `branch` exists; the existing branch is untouched
    pub fn branch(
        &self,
        repo: &RepoName,
        commit: &CommitId,
        branch: &BranchName,
    ) -> Result<(), RepoError> {
        self.require_initialized(repo)?;
        let paths = self.btrfs.paths();
        self.btrfs.snapshot(
            paths.commit_path(repo, commit),
            paths.branch_path(repo, branch),
            false,
        )?;
        info!(repo = %repo, commit = %commit, branch = %branch, "branched");
        Ok(())
    }

    /// Replace `branch` with a writable snapshot of `commit`.
    ///
    /// Uncommitted changes on the branch are lost. If the branch does not
    /// exist it is created.
    pub fn reset_branch(
        &self,
        repo: &RepoName,
        commit: &CommitId,
        branch: &BranchName,
    ) -> Result<(), RepoError> {
        self.require_initialized(repo)?;
        let paths = self.btrfs.paths();
        let commit_path = paths.commit_path(repo, commit);
        // Check the source first so a bad commit never costs the branch.
        if !self.btrfs.exists(&commit_path)? {
            return Err(BtrfsError::from(PathError::NotFound {
                path: paths.file_path(&commit_path),
            })
            .into());
        }
        let branch_path = paths.branch_path(repo, branch);
        if self.btrfs.exists(&branch_path)? {
            self.btrfs.subvolume_delete(&branch_path)?;
            debug!(repo = %repo, branch = %branch, "deleted branch for reset");
        }
        self.btrfs.snapshot(commit_path, branch_path, false)?;
        info!(repo = %repo, commit = %commit, branch = %branch, "reset branch");
        Ok(())
    }

    /// Delete a branch. Commits taken from it are kept.
    pub fn delete_branch(&self, repo: &RepoName, branch: &BranchName) -> Result<(), RepoError> {
        self.require_initialized(repo)?;
        self.btrfs
            .subvolume_delete(self.btrfs.paths().branch_path(repo, branch))?;
        info!(repo = %repo, branch = %branch, "deleted branch");
        Ok(())
    }

    /// Delete a commit. Branches created from it are kept.
    pub fn delete_commit(&self, repo: &RepoName, commit: &CommitId) -> Result<(), RepoError> {
        self.require_initialized(repo)?;
        self.btrfs
            .subvolume_delete(self.btrfs.paths().commit_path(repo, commit))?;
        info!(repo = %repo, commit = %commit, "deleted commit");
        Ok(())
    }

    /// Names of all branches, sorted.
    pub fn list_branches(&self, repo: &RepoName) -> Result<Vec<BranchName>, RepoError> {
        self.require_initialized(repo)?;
        let paths = self.btrfs.paths();
        let dir = paths.file_path(paths.branches_dir(repo));
        let entries = std::fs::read_dir(&dir).map_err(|e| BtrfsError::io(&dir, e))?;

        let mut branches = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| BtrfsError::io(&dir, e))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                debug!(dir = %dir.display(), "skipping non-UTF-8 branch name");
                continue;
            };
            branches.push(BranchName::new(name)?);
        }
        branches.sort();
        Ok(branches)
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Stream the raw listing of commits with creation generation
    /// `>= from`, newest first, to `handler`.
    ///
    /// `Generation::ZERO` lists everything. Generations are only comparable
    /// within one filesystem.
    pub fn log<T, F>(&self, repo: &RepoName, from: Generation, handler: F) -> Result<T, RepoError>
    where
        F: FnOnce(&mut dyn Read) -> io::Result<T>,
    {
        self.require_initialized(repo)?;
        let commits = self.btrfs.paths().commits_dir(repo);
        Ok(self.btrfs.list(commits, from, handler)?)
    }

    /// Parsed history, newest generation first.
    pub fn log_entries(
        &self,
        repo: &RepoName,
        from: Generation,
    ) -> Result<Vec<CommitEntry>, RepoError> {
        self.require_initialized(repo)?;
        let commits = self.btrfs.paths().commits_dir(repo);
        let entries = self.btrfs.list_entries(commits, from)?;
        let mut log = Vec::with_capacity(entries.len());
        for entry in &entries {
            log.push(CommitEntry::from_subvolume(entry)?);
        }
        Ok(log)
    }

    /// Newest commit, if any.
    pub fn head(&self, repo: &RepoName) -> Result<Option<CommitEntry>, RepoError> {
        Ok(self.log_entries(repo, Generation::ZERO)?.into_iter().next())
    }

    // =========================================================================
    // Replication
    // =========================================================================

    /// Stream `commit` to `handler`.
    ///
    /// With `parent` the stream is incremental and can only be received
    /// where `parent` is already present.
    pub fn send_commit<T, F>(
        &self,
        repo: &RepoName,
        commit: &CommitId,
        parent: Option<&CommitId>,
        handler: F,
    ) -> Result<T, RepoError>
    where
        F: FnOnce(&mut dyn Read) -> io::Result<T>,
    {
        self.require_initialized(repo)?;
        let paths = self.btrfs.paths();
        let to = paths.commit_path(repo, commit);
        let out = match parent {
            Some(parent) => self
                .btrfs
                .send(paths.commit_path(repo, parent), to, handler)?,
            None => self.btrfs.send_base(to, handler)?,
        };
        info!(
            repo = %repo,
            commit = %commit,
            parent = parent.map(CommitId::as_str).unwrap_or("-"),
            "sent commit"
        );
        Ok(out)
    }

    /// Receive a stream carrying `commit` into the repository's commits.
    ///
    /// Returns the number of bytes consumed.
    ///
    /// # Errors
    ///
    /// - [`RepoError::NotInitialized`] if the repository is incomplete
    /// - already-exists if `commit` is already present (nothing is read)
    /// - [`RepoError::ReceiveMismatch`] if the stream succeeded but carried
    ///   a different subvolume
    pub fn receive_commit<R: Read>(
        &self,
        repo: &RepoName,
        commit: &CommitId,
        stream: R,
    ) -> Result<u64, RepoError> {
        self.require_initialized(repo)?;
        let paths = self.btrfs.paths();
        let commit_path = paths.commit_path(repo, commit);
        if self.btrfs.exists(&commit_path)? {
            return Err(BtrfsError::from(PathError::AlreadyExists {
                path: paths.file_path(&commit_path),
            })
            .into());
        }

        let bytes = self.btrfs.recv(paths.commits_dir(repo), stream)?;
        if !self.btrfs.exists(&commit_path)? {
            return Err(RepoError::ReceiveMismatch {
                commit: commit.clone(),
            });
        }
        info!(repo = %repo, commit = %commit, bytes, "received commit");
        Ok(bytes)
    }

    /// Whether a path is inside this store's namespace.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(self.btrfs.paths().namespace_root())
    }
}
