//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! All engine settings live in one explicit [`Config`] value that is built
//! once and turned into a [`Btrfs`] handle. Nothing is read from ambient
//! global state after that point: the namespace suffix generator is seeded
//! from the config (or the wall clock at build time) and owned by the
//! caller.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file
//! 3. Overrides (CLI flags), see [`Config::with_overrides`]
//!
//! # Config File Locations
//!
//! Searched in order:
//! 1. An explicit path passed to [`Config::load`]
//! 2. `$SNAPREPO_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/snaprepo/config.toml`
//! 4. `~/.snaprepo/config.toml`
//!
//! # Example
//!
//! ```
//! use snaprepo::core::config::{Config, EngineConfig};
//!
//! let config = Config::from_engine_config(EngineConfig {
//!     root: Some("/mnt/pool".into()),
//!     namespace: Some("jobs".into()),
//!     ..Default::default()
//! })
//! .unwrap();
//!
//! let btrfs = config.build().unwrap();
//! assert_eq!(
//!     btrfs.paths().namespace_root(),
//!     std::path::Path::new("/mnt/pool/jobs")
//! );
//! ```

pub mod schema;

pub use schema::EngineConfig;

use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

use crate::btrfs::{Btrfs, ProcessRunner};
use crate::core::namespace::Namespace;
use crate::core::paths::FsPaths;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Resolved engine configuration.
///
/// Accessors apply defaults; the raw file values are kept in
/// [`Config::file`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// Values from the config file merged with overrides
    pub file: EngineConfig,
    /// Path of the loaded config file, if any
    path: Option<PathBuf>,
}

impl Config {
    /// Default storage root.
    pub const DEFAULT_ROOT: &'static str = "/var/lib/pfs/vol";

    /// Default namespace.
    pub const DEFAULT_NAMESPACE: &'static str = "pfs";

    /// Default snapshot tool.
    pub const DEFAULT_TOOL: &'static str = "btrfs";

    /// Environment variable naming a config file.
    pub const ENV_CONFIG: &'static str = "SNAPREPO_CONFIG";

    /// Load configuration from `explicit` or the standard locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read, parsed
    /// or validated. A missing file is not an error; defaults are used.
    /// An explicit path that does not exist is a read error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => Self::find_config_file(),
        };

        let file = match &path {
            Some(p) => Self::read_config(p)?,
            None => EngineConfig::default(),
        };
        file.validate()?;

        Ok(Self { file, path })
    }

    /// Build a configuration from already-parsed values.
    pub fn from_engine_config(file: EngineConfig) -> Result<Self, ConfigError> {
        file.validate()?;
        Ok(Self { file, path: None })
    }

    /// Apply overrides on top of the loaded values.
    pub fn with_overrides(mut self, overrides: EngineConfig) -> Result<Self, ConfigError> {
        self.file.merge(overrides);
        self.file.validate()?;
        Ok(self)
    }

    fn find_config_file() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(Self::ENV_CONFIG) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("snaprepo/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        if let Some(home) = dirs::home_dir() {
            let path = home.join(".snaprepo/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        None
    }

    fn read_config(path: &Path) -> Result<EngineConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Path of the config file that was loaded.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Storage root.
    pub fn root(&self) -> PathBuf {
        self.file
            .root
            .clone()
            .unwrap_or_else(|| PathBuf::from(Self::DEFAULT_ROOT))
    }

    /// Namespace name, or the prefix when a random suffix is appended.
    pub fn namespace(&self) -> &str {
        self.file
            .namespace
            .as_deref()
            .unwrap_or(Self::DEFAULT_NAMESPACE)
    }

    /// Fixed seed for the suffix generator, if configured.
    pub fn seed(&self) -> Option<u64> {
        self.file.seed
    }

    /// Whether random letters are appended to the namespace.
    pub fn random_suffix(&self) -> bool {
        self.file.random_suffix.unwrap_or(false)
    }

    /// Snapshot tool binary.
    pub fn tool(&self) -> &str {
        self.file.tool.as_deref().unwrap_or(Self::DEFAULT_TOOL)
    }

    /// A fresh suffix generator.
    ///
    /// Seeded from `seed` when configured, otherwise from the wall clock.
    /// Not suitable for anything security-related.
    pub fn rng(&self) -> StdRng {
        let seed = self.file.seed.unwrap_or_else(|| {
            let now = chrono::Utc::now();
            now.timestamp_nanos_opt()
                .map(|n| n as u64)
                .unwrap_or_else(|| now.timestamp() as u64)
        });
        StdRng::seed_from_u64(seed)
    }

    /// Resolve the namespace, drawing a suffix if configured.
    pub fn resolve_namespace(&self) -> Result<Namespace, ConfigError> {
        let ns = if self.random_suffix() {
            Namespace::with_random_suffix(self.namespace(), &mut self.rng())
        } else {
            Namespace::new(self.namespace())
        };
        ns.map_err(|e| ConfigError::InvalidValue(e.to_string()))
    }

    /// Path resolver for the resolved namespace.
    pub fn paths(&self) -> Result<FsPaths, ConfigError> {
        Ok(FsPaths::new(self.root(), self.resolve_namespace()?))
    }

    /// Build the tool handle.
    ///
    /// Each call resolves the namespace again, so with `random_suffix`
    /// every handle gets its own namespace.
    pub fn build(&self) -> Result<Btrfs, ConfigError> {
        Ok(Btrfs::new(self.paths()?, ProcessRunner::new(self.tool())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.root(), PathBuf::from(Config::DEFAULT_ROOT));
        assert_eq!(config.namespace(), Config::DEFAULT_NAMESPACE);
        assert_eq!(config.tool(), Config::DEFAULT_TOOL);
        assert!(!config.random_suffix());
        assert!(config.path().is_none());
    }

    #[test]
    fn load_explicit_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "root = \"/srv/vol\"\nnamespace = \"x\"").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.root(), PathBuf::from("/srv/vol"));
        assert_eq!(config.namespace(), "x");
        assert_eq!(config.path(), Some(file.path()));
    }

    #[test]
    fn load_missing_explicit_file_fails() {
        let err = Config::load(Some(Path::new("/nonexistent/snaprepo.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn load_bad_toml_fails() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "root = ").unwrap();
        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn overrides_win() {
        let config = Config::default()
            .with_overrides(EngineConfig {
                tool: Some("/opt/fake-btrfs".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(config.tool(), "/opt/fake-btrfs");
    }

    #[test]
    fn invalid_override_rejected() {
        let result = Config::default().with_overrides(EngineConfig {
            namespace: Some("../escape".into()),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn seeded_suffix_is_reproducible() {
        let config = Config::from_engine_config(EngineConfig {
            namespace: Some("t-".into()),
            random_suffix: Some(true),
            seed: Some(1234),
            ..Default::default()
        })
        .unwrap();
        let a = config.resolve_namespace().unwrap();
        let b = config.resolve_namespace().unwrap();
        assert_eq!(a, b);
        assert!(a.as_str().starts_with("t-"));
        assert_eq!(a.as_str().len(), 2 + crate::core::namespace::SUFFIX_LEN);
    }

    #[test]
    fn build_uses_root_and_namespace() {
        let config = Config::from_engine_config(EngineConfig {
            root: Some("/mnt/pool".into()),
            namespace: Some("jobs".into()),
            ..Default::default()
        })
        .unwrap();
        let btrfs = config.build().unwrap();
        assert_eq!(btrfs.paths().namespace_root(), Path::new("/mnt/pool/jobs"));
        assert_eq!(btrfs.runner().tool(), std::ffi::OsStr::new("btrfs"));
    }
}
