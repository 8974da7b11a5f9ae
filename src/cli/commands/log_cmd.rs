//! log command - Display commits, newest first
//!
//! Three output forms: an aligned table (default), JSON lines for
//! scripting, and the tool's raw listing.

use std::io::{self, Write};

use crate::cli::Context;
use crate::core::types::{Generation, RepoName};
use crate::repo::CommitEntry;
use anyhow::{Context as _, Result};

/// Show the history of `repo` from generation `from`.
pub fn log(ctx: &Context, repo: &str, from: u64, json: bool, raw: bool) -> Result<()> {
    let repo: RepoName = repo.parse()?;
    let from = Generation::new(from);
    let store = ctx.store()?;

    if raw {
        store
            .log(&repo, from, |r| io::copy(r, &mut io::stdout().lock()))
            .context("Failed to list commits")?;
        return Ok(());
    }

    let entries = store
        .log_entries(&repo, from)
        .context("Failed to list commits")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if json {
        for entry in &entries {
            serde_json::to_writer(&mut out, entry)?;
            writeln!(out)?;
        }
    } else if entries.is_empty() {
        if !ctx.quiet {
            eprintln!("No commits in '{}' from generation {}.", repo, from);
        }
    } else {
        print_table(&mut out, &entries)?;
    }
    Ok(())
}

fn print_table(out: &mut impl Write, entries: &[CommitEntry]) -> io::Result<()> {
    let width = entries
        .iter()
        .map(|e| e.generation.get().to_string().len())
        .max()
        .unwrap_or(0)
        .max("GEN".len());

    writeln!(out, "{:>width$}  COMMIT", "GEN", width = width)?;
    for entry in entries {
        writeln!(
            out,
            "{:>width$}  {}",
            entry.generation.get(),
            entry.id,
            width = width
        )?;
    }
    Ok(())
}
