//! btrfs::interface
//!
//! The [`Btrfs`] handle: subvolume primitives, snapshots, listings and
//! send/receive, all scoped to one namespace.
//!
//! # Architecture
//!
//! `Btrfs` is the only type that builds tool command lines. It checks the
//! cheap existence preconditions itself (so callers get a typed
//! [`PathError`] instead of parsing tool messages), then delegates to the
//! [`ProcessRunner`].
//!
//! The existence checks are check-then-act. Another process can create or
//! remove the same path between the check and the tool call. When a create
//! or snapshot fails and its target exists afterwards, the loser of that
//! race gets [`PathError::AlreadyExists`]; any other tool failure comes
//! back as a [`ProcessError::Failed`] carrying stderr.
//!
//! # Example
//!
//! ```no_run
//! use snaprepo::btrfs::{Btrfs, ProcessRunner};
//! use snaprepo::core::namespace::Namespace;
//! use snaprepo::core::paths::FsPaths;
//!
//! let btrfs = Btrfs::new(
//!     FsPaths::new("/var/lib/pfs/vol", Namespace::new("ns").unwrap()),
//!     ProcessRunner::new("btrfs"),
//! );
//! btrfs.ensure_namespace()?;
//! btrfs.subvolume_create("scratch")?;
//! btrfs.snapshot("scratch", "scratch-ro", true)?;
//! # Ok::<(), snaprepo::btrfs::BtrfsError>(())
//! ```

use std::ffi::OsString;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::error::{BtrfsError, PathError, ProcessError};
use super::listing::{self, SubvolumeEntry};
use super::runner::ProcessRunner;
use crate::core::paths::FsPaths;
use crate::core::types::Generation;

/// Namespaced handle on the snapshot tool.
#[derive(Debug, Clone)]
pub struct Btrfs {
    paths: FsPaths,
    runner: ProcessRunner,
}

impl Btrfs {
    /// Create a handle for the namespace described by `paths`.
    pub fn new(paths: FsPaths, runner: ProcessRunner) -> Self {
        Self { paths, runner }
    }

    /// The path resolver.
    pub fn paths(&self) -> &FsPaths {
        &self.paths
    }

    /// The process runner.
    pub fn runner(&self) -> &ProcessRunner {
        &self.runner
    }

    // =========================================================================
    // Existence checks
    // =========================================================================

    /// Whether anything exists at the logical name `name`.
    ///
    /// # Errors
    ///
    /// Returns [`BtrfsError::Io`] if the path cannot be inspected for a
    /// reason other than not existing (e.g. permissions).
    pub fn exists(&self, name: impl AsRef<Path>) -> Result<bool, BtrfsError> {
        let path = self.paths.file_path(name);
        exists_abs(&path)
    }

    fn require_exists(&self, path: &Path) -> Result<(), BtrfsError> {
        if exists_abs(path)? {
            Ok(())
        } else {
            Err(PathError::NotFound {
                path: path.to_path_buf(),
            }
            .into())
        }
    }

    fn require_absent(&self, path: &Path) -> Result<(), BtrfsError> {
        if exists_abs(path)? {
            Err(PathError::AlreadyExists {
                path: path.to_path_buf(),
            }
            .into())
        } else {
            Ok(())
        }
    }

    fn require_parent(&self, path: &Path) -> Result<(), BtrfsError> {
        let present = match path.parent() {
            Some(parent) => exists_abs(parent)?,
            None => false,
        };
        if present {
            Ok(())
        } else {
            Err(PathError::ParentMissing {
                path: path.to_path_buf(),
            }
            .into())
        }
    }

    // =========================================================================
    // Subvolume primitives
    // =========================================================================

    /// Create an empty subvolume at `name`.
    ///
    /// # Errors
    ///
    /// - [`PathError::ParentMissing`] if the containing directory is absent
    /// - [`PathError::AlreadyExists`] if something already exists at `name`
    /// - [`ProcessError`] if the tool fails
    pub fn subvolume_create(&self, name: impl AsRef<Path>) -> Result<(), BtrfsError> {
        let path = self.paths.file_path(name);
        self.require_parent(&path)?;
        self.require_absent(&path)?;

        let args = vec![arg("subvolume"), arg("create"), path.clone().into_os_string()];
        self.run_creating(args, &path)
    }

    /// Delete the subvolume at `name`.
    ///
    /// # Errors
    ///
    /// - [`PathError::NotFound`] if nothing exists at `name`
    /// - [`ProcessError`] if the tool fails (e.g. `name` is a plain
    ///   directory, or still contains nested subvolumes)
    pub fn subvolume_delete(&self, name: impl AsRef<Path>) -> Result<(), BtrfsError> {
        let path = self.paths.file_path(name);
        self.require_exists(&path)?;

        let mut args = vec![arg("subvolume"), arg("delete")];
        args.push(path.into_os_string());
        self.runner.run(self.runner.tool_command(args))?;
        Ok(())
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Snapshot `source` to `dest`; read-only when `readonly` is set.
    ///
    /// # Errors
    ///
    /// - [`PathError::NotFound`] if `source` does not exist
    /// - [`PathError::ParentMissing`] if the directory for `dest` is absent
    /// - [`PathError::AlreadyExists`] if `dest` already exists
    /// - [`ProcessError`] if the tool fails
    pub fn snapshot(
        &self,
        source: impl AsRef<Path>,
        dest: impl AsRef<Path>,
        readonly: bool,
    ) -> Result<(), BtrfsError> {
        let source = self.paths.file_path(source);
        let dest = self.paths.file_path(dest);
        self.require_exists(&source)?;
        self.require_parent(&dest)?;
        self.require_absent(&dest)?;

        let mut args = vec![arg("subvolume"), arg("snapshot")];
        if readonly {
            args.push(arg("-r"));
        }
        args.push(source.into_os_string());
        args.push(dest.clone().into_os_string());
        self.run_creating(args, &dest)
    }

    /// Run a tool call that creates `target`, reporting a lost creation
    /// race as already-exists.
    fn run_creating(&self, args: Vec<OsString>, target: &Path) -> Result<(), BtrfsError> {
        match self.runner.run(self.runner.tool_command(args)) {
            Ok(_) => Ok(()),
            Err(err) if exists_abs(target)? => {
                debug!(path = %target.display(), error = %err, "target created concurrently");
                Err(PathError::AlreadyExists {
                    path: target.to_path_buf(),
                }
                .into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Make sure the namespace root subvolume exists.
    ///
    /// Creates it if absent. If creation fails but the root exists
    /// afterwards, a concurrent caller won the race and the call succeeds.
    ///
    /// # Errors
    ///
    /// - [`PathError::ParentMissing`] if the storage root is absent
    /// - any creation failure that did not leave the namespace in place
    pub fn ensure_namespace(&self) -> Result<(), BtrfsError> {
        if self.exists("")? {
            return Ok(());
        }
        if let Err(err) = self.subvolume_create("") {
            if !self.exists("")? {
                return Err(err);
            }
            warn!(
                namespace = %self.paths.namespace(),
                error = %err,
                "namespace appeared concurrently; continuing"
            );
            return Ok(());
        }
        info!(namespace = %self.paths.namespace(), "created namespace");
        Ok(())
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// Stream the raw listing of subvolumes below `name` with creation
    /// generation `>= from`, newest first, to `handler`.
    ///
    /// Runs `subvolume list -o -c -C +{from} --sort=-ogen`.
    pub fn list<T, F>(
        &self,
        name: impl AsRef<Path>,
        from: Generation,
        handler: F,
    ) -> Result<T, BtrfsError>
    where
        F: FnOnce(&mut dyn Read) -> io::Result<T>,
    {
        let path = self.paths.file_path(name);
        self.require_exists(&path)?;

        let args = vec![
            arg("subvolume"),
            arg("list"),
            arg("-o"),
            arg("-c"),
            arg("-C"),
            format!("+{}", from).into(),
            arg("--sort=-ogen"),
            path.into_os_string(),
        ];
        self.runner.run_streaming(self.runner.tool_command(args), handler)
    }

    /// Parsed listing of subvolumes below `name`, newest first.
    pub fn list_entries(
        &self,
        name: impl AsRef<Path>,
        from: Generation,
    ) -> Result<Vec<SubvolumeEntry>, BtrfsError> {
        let lines = self.list(name, from, |r| listing::read_lines(BufReader::new(r)))?;
        let mut entries = lines
            .iter()
            .map(|l| listing::parse_line(l))
            .collect::<Result<Vec<_>, _>>()?;
        // The tool already sorts; keep the order stable if it did not.
        entries.sort_by(|a, b| b.generation().cmp(&a.generation()));
        Ok(entries)
    }

    // =========================================================================
    // Replication
    // =========================================================================

    /// Stream the full serialized content of the read-only subvolume `to`.
    pub fn send_base<T, F>(&self, to: impl AsRef<Path>, handler: F) -> Result<T, BtrfsError>
    where
        F: FnOnce(&mut dyn Read) -> io::Result<T>,
    {
        let to = self.paths.file_path(to);
        self.require_exists(&to)?;

        let args = vec![arg("send"), to.into_os_string()];
        self.runner.run_streaming(self.runner.tool_command(args), handler)
    }

    /// Stream the difference turning `from` into `to`.
    ///
    /// `from` must be an ancestor of `to` that is already present wherever
    /// the stream will be received. Request pairs in creation order
    /// (earlier, later); the reverse is rejected by the tool.
    pub fn send<T, F>(
        &self,
        from: impl AsRef<Path>,
        to: impl AsRef<Path>,
        handler: F,
    ) -> Result<T, BtrfsError>
    where
        F: FnOnce(&mut dyn Read) -> io::Result<T>,
    {
        let from = self.paths.file_path(from);
        let to = self.paths.file_path(to);
        self.require_exists(&from)?;
        self.require_exists(&to)?;

        let args = vec![
            arg("send"),
            arg("-p"),
            from.into_os_string(),
            to.into_os_string(),
        ];
        self.runner.run_streaming(self.runner.tool_command(args), handler)
    }

    /// Materialize the subvolume carried by `stream` inside the directory
    /// `dest_dir`.
    ///
    /// The stream is consumed and closed. Returns the number of bytes
    /// copied. After a failure the destination may contain a partially
    /// written subvolume; delete it before retrying.
    ///
    /// # Errors
    ///
    /// - [`PathError::NotFound`] if `dest_dir` does not exist
    /// - [`BtrfsError::Stream`] if the transfer breaks
    /// - [`ProcessError`] if the tool rejects the stream (including when
    ///   the subvolume it carries already exists)
    pub fn recv<R: Read>(&self, dest_dir: impl AsRef<Path>, stream: R) -> Result<u64, BtrfsError> {
        let dest = self.paths.file_path(dest_dir);
        self.require_exists(&dest)?;

        let args = vec![arg("receive"), dest.into_os_string()];
        self.runner.run_feeding(self.runner.tool_command(args), stream)
    }

    /// Flush filesystem buffers with the system `sync` command.
    pub fn sync(&self) -> Result<(), ProcessError> {
        self.runner.run(std::process::Command::new("sync"))?;
        Ok(())
    }
}

fn arg(s: &str) -> OsString {
    OsString::from(s)
}

fn exists_abs(path: &Path) -> Result<bool, BtrfsError> {
    match std::fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(BtrfsError::io(PathBuf::from(path), e)),
    }
}
