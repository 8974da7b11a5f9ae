//! commit command - Snapshot a branch

use crate::cli::Context;
use crate::core::types::{BranchName, CommitId, RepoName};
use anyhow::{Context as _, Result};

/// Commit `branch` and print the new commit id.
///
/// The id is printed even in quiet mode so scripts can capture it.
pub fn commit(ctx: &Context, repo: &str, branch: &str) -> Result<()> {
    let repo: RepoName = repo.parse()?;
    let branch: BranchName = branch.parse()?;
    let store = ctx.store()?;

    let id = store
        .commit(&repo, &branch)
        .with_context(|| format!("Failed to commit branch '{}'", branch))?;
    println!("{}", id);
    Ok(())
}

/// Delete a commit.
pub fn delete_commit(ctx: &Context, repo: &str, commit: &str) -> Result<()> {
    let repo: RepoName = repo.parse()?;
    let commit: CommitId = commit.parse()?;
    let store = ctx.store()?;

    store
        .delete_commit(&repo, &commit)
        .with_context(|| format!("Failed to delete commit '{}'", commit))?;
    if !ctx.quiet {
        println!("Deleted commit '{}'.", commit);
    }
    Ok(())
}
