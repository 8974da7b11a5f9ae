//! send/recv commands - Replicate commits through stdout and stdin

use std::io::{self, Write};

use crate::cli::Context;
use crate::core::types::{CommitId, RepoName};
use anyhow::{Context as _, Result};
use tracing::info;

/// Write the send stream for `commit` to stdout.
///
/// With `parent` the stream is incremental.
pub fn send(ctx: &Context, repo: &str, commit: &str, parent: Option<&str>) -> Result<()> {
    let repo: RepoName = repo.parse()?;
    let commit: CommitId = commit.parse()?;
    let parent = parent.map(|p| p.parse::<CommitId>()).transpose()?;
    let store = ctx.store()?;

    let bytes = store
        .send_commit(&repo, &commit, parent.as_ref(), |r| {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            let n = io::copy(r, &mut out)?;
            out.flush()?;
            Ok(n)
        })
        .with_context(|| format!("Failed to send commit '{}'", commit))?;
    info!(bytes, "send stream written to stdout");
    Ok(())
}

/// Read a send stream from stdin into `repo`'s commits.
pub fn recv(ctx: &Context, repo: &str, commit: &str) -> Result<()> {
    let repo: RepoName = repo.parse()?;
    let commit: CommitId = commit.parse()?;
    let store = ctx.store()?;

    let bytes = store
        .receive_commit(&repo, &commit, io::stdin().lock())
        .with_context(|| format!("Failed to receive commit '{}'", commit))?;
    if !ctx.quiet {
        eprintln!("Received commit '{}' ({} bytes).", commit, bytes);
    }
    Ok(())
}
