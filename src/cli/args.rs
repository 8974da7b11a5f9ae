//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Config file to load instead of the default lookup
//! - `--root <path>`: Storage root override
//! - `--namespace <name>`: Namespace override
//! - `--tool <program>`: Snapshot tool override
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// snaprepo - Git-like repositories on btrfs subvolumes
#[derive(Parser, Debug)]
#[command(name = "snaprepo")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to load (skips the default lookup)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Storage root (an absolute path on a btrfs filesystem)
    #[arg(long, global = true, value_name = "PATH")]
    pub root: Option<PathBuf>,

    /// Namespace inside the storage root
    #[arg(long, global = true)]
    pub namespace: Option<String>,

    /// Snapshot tool program
    #[arg(long, global = true, value_name = "PROGRAM")]
    pub tool: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the namespace root subvolume if it is missing
    #[command(
        name = "ensure-namespace",
        long_about = "Create the namespace root subvolume if it is missing.\n\n\
            Prints the resolved namespace root. With `random_suffix` in the \
            config file a `seed` is required, so every command resolves the \
            same namespace."
    )]
    EnsureNamespace,

    /// Create a repository (branches/, branches/master, commits/)
    #[command(
        long_about = "Create a repository.\n\n\
            Creates the repository subvolume with its branches and commits \
            subvolumes and an empty master branch. Parts that already exist are \
            left alone, so re-running after an interrupted init completes it.",
        after_help = "\
EXAMPLES:
    snaprepo init data
    snaprepo --namespace staging init data"
    )]
    Init {
        /// Repository name
        repo: String,
    },

    /// Take a read-only snapshot of a branch
    Commit {
        /// Repository name
        repo: String,

        /// Branch to commit
        #[arg(short, long, default_value = "master")]
        branch: String,
    },

    /// Create a writable branch from a commit
    #[command(after_help = "\
EXAMPLES:
    # Start a branch from a commit
    snaprepo branch data master-2024-01-02T03:04:05.000006+00:00 experiment

    # Throw away uncommitted work on master
    snaprepo branch --force data master-2024-01-02T03:04:05.000006+00:00 master")]
    Branch {
        /// Repository name
        repo: String,

        /// Commit to branch from
        commit: String,

        /// New branch name
        branch: String,

        /// Replace the branch if it exists
        #[arg(long)]
        force: bool,
    },

    /// List branches
    Branches {
        /// Repository name
        repo: String,
    },

    /// Show commits, newest first
    Log {
        /// Repository name
        repo: String,

        /// Only commits created at or after this generation
        #[arg(long, default_value_t = 0)]
        from: u64,

        /// Print JSON lines instead of a table
        #[arg(long, conflicts_with = "raw")]
        json: bool,

        /// Print the tool's listing unparsed
        #[arg(long)]
        raw: bool,
    },

    /// Write a commit's send stream to stdout
    #[command(after_help = "\
EXAMPLES:
    # Full copy to another store
    snaprepo send data c1 | snaprepo --root /mnt/backup recv data c1

    # Incremental, once c1 is present on the other side
    snaprepo send data c2 --parent c1 | snaprepo --root /mnt/backup recv data c2")]
    Send {
        /// Repository name
        repo: String,

        /// Commit to send
        commit: String,

        /// Earlier commit already present at the receiver
        #[arg(long)]
        parent: Option<String>,
    },

    /// Read a send stream from stdin into the repository's commits
    Recv {
        /// Repository name
        repo: String,

        /// Commit carried by the stream
        commit: String,
    },

    /// Delete a branch
    #[command(name = "delete-branch")]
    DeleteBranch {
        /// Repository name
        repo: String,

        /// Branch to delete
        branch: String,
    },

    /// Delete a commit
    #[command(name = "delete-commit")]
    DeleteCommit {
        /// Repository name
        repo: String,

        /// Commit to delete
        commit: String,
    },
}
