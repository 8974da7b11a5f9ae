//! branch commands - Create, list and delete branches

use crate::cli::Context;
use crate::core::types::{BranchName, CommitId, RepoName};
use anyhow::{Context as _, Result};

/// Create `branch` from `commit`.
///
/// # Arguments
///
/// * `ctx` - Execution context
/// * `repo` - Repository name
/// * `commit` - Source commit
/// * `branch` - Branch to create
/// * `force` - Replace the branch if it already exists
pub fn branch(ctx: &Context, repo: &str, commit: &str, branch: &str, force: bool) -> Result<()> {
    let repo: RepoName = repo.parse()?;
    let commit: CommitId = commit.parse()?;
    let branch: BranchName = branch.parse()?;
    let store = ctx.store()?;

    if force {
        store
            .reset_branch(&repo, &commit, &branch)
            .with_context(|| format!("Failed to reset branch '{}'", branch))?;
    } else {
        store
            .branch(&repo, &commit, &branch)
            .with_context(|| {
                format!("Failed to create branch '{}' (use --force to replace)", branch)
            })?;
    }

    if !ctx.quiet {
        println!("Branch '{}' now at '{}'.", branch, commit);
    }
    Ok(())
}

/// Print branch names, one per line.
pub fn branches(ctx: &Context, repo: &str) -> Result<()> {
    let repo: RepoName = repo.parse()?;
    let store = ctx.store()?;

    let names = store
        .list_branches(&repo)
        .context("Failed to list branches")?;
    for name in names {
        println!("{}", name);
    }
    Ok(())
}

/// Delete a branch.
pub fn delete_branch(ctx: &Context, repo: &str, branch: &str) -> Result<()> {
    let repo: RepoName = repo.parse()?;
    let branch: BranchName = branch.parse()?;
    let store = ctx.store()?;

    store
        .delete_branch(&repo, &branch)
        .with_context(|| format!("Failed to delete branch '{}'", branch))?;
    if !ctx.quiet {
        println!("Deleted branch '{}'.", branch);
    }
    Ok(())
}
