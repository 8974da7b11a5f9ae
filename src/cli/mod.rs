//! cli
//!
//! Command-line interface layer for snaprepo.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Resolve configuration (file, then flag overrides)
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap, builds a
//! [`Context`] from the resolved configuration and dispatches to
//! [`commands`]. All subvolume changes go through [`crate::repo::RepoStore`].
//! Diagnostics go to stderr; stdout carries command output and send streams.

pub mod args;
pub mod commands;

pub use args::Cli;

use anyhow::{bail, Context as _, Result};

use crate::btrfs::Btrfs;
use crate::core::config::{Config, EngineConfig};
use crate::repo::RepoStore;

/// Execution context shared by command handlers.
#[derive(Debug, Clone)]
pub struct Context {
    /// Resolved configuration.
    pub config: Config,
    /// Debug logging enabled.
    pub debug: bool,
    /// Quiet mode (minimal output).
    pub quiet: bool,
}

impl Context {
    /// Resolve configuration from the CLI flags.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let overrides = EngineConfig {
            root: cli.root.clone(),
            namespace: cli.namespace.clone(),
            tool: cli.tool.clone(),
            ..EngineConfig::default()
        };
        let config = Config::load(cli.config.as_deref())
            .context("Failed to load configuration")?
            .with_overrides(overrides)
            .context("Invalid configuration override")?;
        // Each invocation resolves the namespace afresh; only a seed keeps
        // it the same from one command to the next.
        if config.random_suffix() && config.seed().is_none() {
            bail!(
                "random_suffix needs a fixed `seed` in the config file; without one \
                 every command would pick a different namespace"
            );
        }
        Ok(Self {
            config,
            debug: cli.debug,
            quiet: cli.quiet,
        })
    }

    /// Tool handle for the configured namespace.
    pub fn btrfs(&self) -> Result<Btrfs> {
        self.config
            .build()
            .context("Failed to resolve storage location")
    }

    /// Repository store for the configured namespace.
    pub fn store(&self) -> Result<RepoStore> {
        Ok(RepoStore::new(self.btrfs()?))
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run(cli: Cli) -> Result<()> {
    let ctx = Context::from_cli(&cli)?;
    commands::dispatch(cli.command, &ctx)
}
