//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Validation
//!
//! Values are validated after parsing: the namespace (or namespace prefix,
//! when a random suffix is requested) must be a usable path component, the
//! root must be absolute and the tool must be non-empty.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::namespace::Namespace;

/// Engine configuration file.
///
/// # Example
///
/// ```toml
/// root = "/var/lib/pfs/vol"
/// namespace = "pipeline-"
/// random_suffix = true
/// seed = 42
/// tool = "/usr/bin/btrfs"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Shared storage root (a mounted btrfs filesystem or subvolume)
    pub root: Option<PathBuf>,

    /// Namespace name, or prefix when `random_suffix` is set
    pub namespace: Option<String>,

    /// Append random letters to the namespace
    pub random_suffix: Option<bool>,

    /// Seed for the namespace suffix generator; wall-clock time if unset
    pub seed: Option<u64>,

    /// Snapshot tool binary
    pub tool: Option<String>,
}

impl EngineConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(root) = &self.root {
            if !root.is_absolute() {
                return Err(ConfigError::InvalidValue(format!(
                    "root must be an absolute path, got '{}'",
                    root.display()
                )));
            }
        }

        if let Some(ns) = &self.namespace {
            // An empty prefix is fine when letters are appended to it.
            let suffixed = self.random_suffix.unwrap_or(false);
            if !(suffixed && ns.is_empty()) {
                let probe = if suffixed {
                    format!("{}x", ns)
                } else {
                    ns.clone()
                };
                Namespace::new(probe).map_err(|e| {
                    ConfigError::InvalidValue(format!("invalid namespace: {}", e))
                })?;
            }
        }

        if let Some(tool) = &self.tool {
            if tool.trim().is_empty() {
                return Err(ConfigError::InvalidValue("tool cannot be empty".to_string()));
            }
        }

        Ok(())
    }

    /// Overlay `other` on top of `self`: every value set in `other` wins.
    pub fn merge(&mut self, other: EngineConfig) {
        if other.root.is_some() {
            self.root = other.root;
        }
        if other.namespace.is_some() {
            self.namespace = other.namespace;
        }
        if other.random_suffix.is_some() {
            self.random_suffix = other.random_suffix;
        }
        if other.seed.is_some() {
            self.seed = other.seed;
        }
        if other.tool.is_some() {
            self.tool = other.tool;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn parse_full() {
        let toml = r#"
            root = "/mnt/pool"
            namespace = "ns"
            random_suffix = true
            seed = 9
            tool = "btrfs"
        "#;
        let config: EngineConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.root, Some(PathBuf::from("/mnt/pool")));
        assert_eq!(config.namespace.as_deref(), Some("ns"));
        assert_eq!(config.random_suffix, Some(true));
        assert_eq!(config.seed, Some(9));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_fields_rejected() {
        let parsed: Result<EngineConfig, _> = toml::from_str("mystery = 1");
        assert!(parsed.is_err());
    }

    #[test]
    fn relative_root_rejected() {
        let config = EngineConfig {
            root: Some(PathBuf::from("relative/dir")),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_namespace_rejected() {
        let config = EngineConfig {
            namespace: Some("a/b".into()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_prefix_ok_with_suffix() {
        let config = EngineConfig {
            namespace: Some(String::new()),
            random_suffix: Some(true),
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let config = EngineConfig {
            namespace: Some(String::new()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_tool_rejected() {
        let config = EngineConfig {
            tool: Some("  ".into()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn merge_prefers_other() {
        let mut base = EngineConfig {
            root: Some(PathBuf::from("/a")),
            namespace: Some("one".into()),
            ..Default::default()
        };
        base.merge(EngineConfig {
            namespace: Some("two".into()),
            tool: Some("fake".into()),
            ..Default::default()
        });
        assert_eq!(base.root, Some(PathBuf::from("/a")));
        assert_eq!(base.namespace.as_deref(), Some("two"));
        assert_eq!(base.tool.as_deref(), Some("fake"));
    }
}
