//! core
//!
//! Core domain types, naming rules, path routing and configuration.
//!
//! # Modules
//!
//! - [`types`] - Strong types: RepoName, BranchName, CommitId, Generation
//! - [`namespace`] - Namespace names and random suffixes
//! - [`paths`] - Centralized path routing under `{root}/{namespace}`
//! - [`naming`] - Commit naming and the commit clock
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid names reaching the filesystem
//! - No ambient global state: everything hangs off an explicit config

pub mod config;
pub mod namespace;
pub mod naming;
pub mod paths;
pub mod types;
