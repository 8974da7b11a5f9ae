//! btrfs
//!
//! Single interface for all snapshot tool operations.
//!
//! # Architecture
//!
//! This module is the **only doorway** to the external `btrfs` tool. Every
//! subvolume, snapshot, listing and replication call flows through
//! [`Btrfs`], which routes each invocation through [`ProcessRunner`]. No
//! other module spawns the tool.
//!
//! # Responsibilities
//!
//! - Subvolume create/delete
//! - Read-only and writable snapshots
//! - Namespace bootstrap
//! - Generation-filtered listings
//! - Full and incremental send, and receive
//!
//! # Invariants
//!
//! - Every call blocks for the lifetime of at most one subprocess
//! - Payload streams are never buffered whole
//! - Errors carry the tool's captured stderr
//!
//! # Example
//!
//! ```no_run
//! use snaprepo::btrfs::{Btrfs, ProcessRunner};
//! use snaprepo::core::namespace::Namespace;
//! use snaprepo::core::paths::FsPaths;
//! use std::io;
//!
//! let btrfs = Btrfs::new(
//!     FsPaths::new("/var/lib/pfs/vol", Namespace::new("ns").unwrap()),
//!     ProcessRunner::new("btrfs"),
//! );
//!
//! // Stream a commit to stdout without holding it in memory.
//! btrfs.send_base("repo/commits/master-x", |r| io::copy(r, &mut io::stdout()))?;
//! # Ok::<(), snaprepo::btrfs::BtrfsError>(())
//! ```

mod error;
mod interface;
pub mod listing;
pub mod runner;

pub use error::{BtrfsError, PathError, ProcessError};
pub use interface::Btrfs;
pub use listing::{ListingError, SubvolumeEntry};
pub use runner::{ProcessOutput, ProcessRunner};
