//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Validates command-specific arguments into domain types
//! 2. Calls the [`crate::repo::RepoStore`]
//! 3. Formats and displays output
//!
//! Human-readable confirmations are suppressed by `--quiet`; data output
//! (listings, ids, streams) is not.

mod branch;
mod commit;
mod init;
mod log_cmd;
mod replicate;

// Re-export command functions for testing and direct invocation
pub use branch::{branch, branches, delete_branch};
pub use commit::{commit, delete_commit};
pub use init::{ensure_namespace, init};
pub use log_cmd::log;
pub use replicate::{recv, send};

use crate::cli::args::Command;
use crate::cli::Context;
use anyhow::Result;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::EnsureNamespace => init::ensure_namespace(ctx),
        Command::Init { repo } => init::init(ctx, &repo),

        Command::Commit { repo, branch } => commit::commit(ctx, &repo, &branch),
        Command::DeleteCommit { repo, commit } => commit::delete_commit(ctx, &repo, &commit),

        Command::Branch {
            repo,
            commit,
            branch,
            force,
        } => branch::branch(ctx, &repo, &commit, &branch, force),
        Command::Branches { repo } => branch::branches(ctx, &repo),
        Command::DeleteBranch { repo, branch } => branch::delete_branch(ctx, &repo, &branch),

        Command::Log {
            repo,
            from,
            json,
            raw,
        } => log_cmd::log(ctx, &repo, from, json, raw),

        Command::Send {
            repo,
            commit,
            parent,
        } => replicate::send(ctx, &repo, &commit, parent.as_deref()),
        Command::Recv { repo, commit } => replicate::recv(ctx, &repo, &commit),
    }
}
