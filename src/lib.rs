//! snaprepo - Git-like repositories on btrfs subvolumes
//!
//! snaprepo gives directories version control semantics using the
//! copy-on-write snapshots of a btrfs filesystem: a repository is a
//! subvolume holding writable branches and read-only commits, and commits
//! replicate between filesystems as send streams.
//!
//! # Architecture
//!
//! The codebase is layered:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to repo)
//! - [`repo`] - Repositories, branches, commits and replication
//! - [`btrfs`] - Single interface for all snapshot tool invocations
//! - [`files`] - Plain file operations addressed by logical name
//! - [`core`] - Domain types, paths, naming and configuration
//!
//! # Invariants
//!
//! 1. Every path an operation touches resolves under `{root}/{namespace}`
//! 2. Commits are read-only; branches are writable
//! 3. Commit ids issued by one store are unique and time-ordered
//! 4. Send streams are never buffered whole in memory

pub mod btrfs;
pub mod cli;
pub mod core;
pub mod files;
pub mod repo;
