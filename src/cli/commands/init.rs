//! init command - Create the namespace and repository skeleton

use crate::cli::Context;
use crate::core::types::RepoName;
use crate::repo::RepoStore;
use anyhow::{Context as _, Result};

/// Create the namespace root subvolume if it is missing.
pub fn ensure_namespace(ctx: &Context) -> Result<()> {
    let btrfs = ctx.btrfs()?;
    btrfs
        .ensure_namespace()
        .context("Failed to create namespace")?;
    if !ctx.quiet {
        println!("Namespace ready: {}", btrfs.paths().namespace_root().display());
    }
    Ok(())
}

/// Create a repository.
///
/// Bootstraps the namespace first, then creates whatever part of the
/// skeleton is missing.
///
/// # Arguments
///
/// * `ctx` - Execution context
/// * `repo` - Repository name
pub fn init(ctx: &Context, repo: &str) -> Result<()> {
    let repo: RepoName = repo.parse()?;
    let btrfs = ctx.btrfs()?;
    btrfs
        .ensure_namespace()
        .context("Failed to create namespace")?;

    let store = RepoStore::new(btrfs);
    let report = store
        .init(&repo)
        .with_context(|| format!("Failed to initialize repository '{}'", repo))?;

    if !ctx.quiet {
        if report.was_complete() {
            println!("Repository '{}' is already initialized.", repo);
        } else if report.is_fresh() {
            println!("Initialized repository '{}'.", repo);
        } else {
            println!(
                "Completed repository '{}' ({} of 4 parts created).",
                repo,
                report.created.len()
            );
        }
    }
    Ok(())
}
