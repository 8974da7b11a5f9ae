//! btrfs::error
//!
//! Typed failures from the snapshot tool boundary.
//!
//! - [`PathError`]: a target is missing or already present
//! - [`ProcessError`]: the tool could not start or exited nonzero
//! - [`BtrfsError::Stream`]: a send/receive transfer broke mid-way; the
//!   destination may hold a partial subvolume that must be deleted before
//!   retrying
//!
//! Whenever a process ran, the error carries its captured stderr.

use std::path::PathBuf;

use thiserror::Error;

use super::listing::ListingError;

/// Existence preconditions checked before invoking the tool.
#[derive(Debug, Error)]
pub enum PathError {
    /// The target does not exist.
    #[error("not found: {path}")]
    NotFound {
        /// The missing path
        path: PathBuf,
    },

    /// The target already exists.
    #[error("already exists: {path}")]
    AlreadyExists {
        /// The existing path
        path: PathBuf,
    },

    /// The directory that would contain the target does not exist.
    #[error("parent directory does not exist: {path}")]
    ParentMissing {
        /// The path whose parent is missing
        path: PathBuf,
    },
}

/// Failures running the external tool.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The process could not be started.
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        /// The command line
        command: String,
        /// The spawn failure
        source: std::io::Error,
    },

    /// The process exited unsuccessfully.
    #[error("`{command}` failed ({status}): {stderr}")]
    Failed {
        /// The command line
        command: String,
        /// Exit status description
        status: String,
        /// Captured stderr
        stderr: String,
    },
}

/// Errors from snapshot tool operations.
#[derive(Debug, Error)]
pub enum BtrfsError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    /// A streamed transfer failed part way.
    #[error("stream failed for `{command}`: {source}; stderr: {stderr}")]
    Stream {
        /// The command line
        command: String,
        /// The I/O failure in the stream handler or copy
        source: std::io::Error,
        /// Captured stderr
        stderr: String,
    },

    #[error(transparent)]
    Listing(#[from] ListingError),

    /// Local filesystem access failed.
    #[error("i/o error on {path}: {source}")]
    Io {
        /// The path being accessed
        path: PathBuf,
        /// The underlying error
        source: std::io::Error,
    },
}

impl BtrfsError {
    /// Captured stderr of the process involved, if one ran.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            BtrfsError::Process(ProcessError::Failed { stderr, .. })
            | BtrfsError::Stream { stderr, .. } => Some(stderr),
            _ => None,
        }
    }

    /// Whether this is an already-exists precondition failure.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, BtrfsError::Path(PathError::AlreadyExists { .. }))
    }

    /// Whether this is a not-found precondition failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BtrfsError::Path(PathError::NotFound { .. }))
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BtrfsError::Io {
            path: path.into(),
            source,
        }
    }
}
