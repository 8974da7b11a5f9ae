//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`RepoName`] - Validated repository name
//! - [`BranchName`] - Validated branch name
//! - [`CommitId`] - Commit identifier (`{branch}-{timestamp}`)
//! - [`Generation`] - Filesystem-assigned creation counter
//!
//! # Validation
//!
//! Names end up as single path components under the namespace root and as
//! arguments to the external tool, so they are validated at construction
//! time. Invalid values cannot be represented.
//!
//! # Examples
//!
//! ```
//! use snaprepo::core::types::{BranchName, CommitId, RepoName};
//!
//! let repo = RepoName::new("images").unwrap();
//! let branch = BranchName::new("master").unwrap();
//! let commit = CommitId::new("master-2024-01-02T15:04:05.123456+00:00").unwrap();
//! assert_eq!(commit.branch().unwrap(), branch);
//!
//! assert!(RepoName::new("a/b").is_err());
//! assert!(BranchName::new("-rf").is_err());
//! # let _ = repo;
//! ```

use std::str::FromStr;

use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid repository name: {0}")]
    InvalidRepoName(String),

    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid commit id: {0}")]
    InvalidCommitId(String),

    #[error("invalid namespace: {0}")]
    InvalidNamespace(String),

    #[error("invalid generation: {0}")]
    InvalidGeneration(String),
}

/// Check that `name` can be used as a single path component and as a
/// command-line argument to the snapshot tool.
///
/// Returns a description of the first violated rule.
pub(crate) fn check_component(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("cannot be empty".into());
    }
    if name == "." || name == ".." {
        return Err(format!("'{name}' is reserved"));
    }
    if name.starts_with('-') {
        return Err("cannot start with '-'".into());
    }
    if name.contains('/') {
        return Err("cannot contain '/'".into());
    }
    if name.chars().any(|c| c.is_control()) {
        return Err("cannot contain control characters".into());
    }
    Ok(())
}

macro_rules! name_type {
    ($(#[$meta:meta])* $name:ident, $variant:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create a new validated name.
            ///
            /// # Errors
            ///
            #[doc = concat!(
                "Returns `TypeError::",
                stringify!($variant),
                "` if the name is not a valid path component."
            )]
            pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
                let name = name.into();
                check_component(&name)
                    .map_err(|rule| TypeError::$variant(format!("'{}' {}", name, rule)))?;
                Ok(Self(name))
            }

            /// Get the name as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = TypeError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::new(s)
            }
        }

        impl FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl From<$name> for String {
            fn from(name: $name) -> Self {
                name.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

name_type!(
    /// A validated repository name.
    ///
    /// A repository is a subvolume directly under the namespace root, so its
    /// name must be a single path component.
    ///
    /// # Example
    ///
    /// ```
    /// use snaprepo::core::types::RepoName;
    ///
    /// assert_eq!(RepoName::new("repoA").unwrap().as_str(), "repoA");
    /// assert!(RepoName::new("").is_err());
    /// assert!(RepoName::new("..").is_err());
    /// ```
    RepoName,
    InvalidRepoName
);

name_type!(
    /// A validated branch name.
    ///
    /// Branches live at `{repo}/branches/{branch}`. Names may contain `-`
    /// (commit ids are split on the fixed-width timestamp suffix, not on
    /// the first dash) but must not start with one.
    ///
    /// # Example
    ///
    /// ```
    /// use snaprepo::core::types::BranchName;
    ///
    /// assert_eq!(BranchName::master().as_str(), "master");
    /// assert!(BranchName::new("feature-x").is_ok());
    /// assert!(BranchName::new("feature/x").is_err());
    /// ```
    BranchName,
    InvalidBranchName
);

impl BranchName {
    /// Name of the branch every repository is initialized with.
    pub const MASTER: &'static str = "master";

    /// The default `master` branch.
    pub fn master() -> Self {
        Self(Self::MASTER.to_string())
    }
}

/// Width of the timestamp suffix of a commit id.
///
/// `YYYY-MM-DDTHH:MM:SS.ffffff+HH:MM`
const STAMP_LEN: usize = 32;

/// Identifier of an immutable commit: `{branch}-{timestamp}`.
///
/// The timestamp has microsecond resolution and carries the UTC offset it
/// was taken in. Identity only: commits are ordered by [`Generation`].
///
/// # Example
///
/// ```
/// use chrono::{FixedOffset, TimeZone};
/// use snaprepo::core::types::{BranchName, CommitId};
///
/// let at = FixedOffset::east_opt(0).unwrap()
///     .with_ymd_and_hms(2024, 1, 2, 15, 4, 5).unwrap();
/// let id = CommitId::for_branch(&BranchName::master(), at);
/// assert_eq!(id.as_str(), "master-2024-01-02T15:04:05.000000+00:00");
/// assert_eq!(id.timestamp(), Some(at));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommitId(String);

impl CommitId {
    /// Create a commit id from an existing name (e.g. read back from a
    /// listing).
    ///
    /// Only path-component rules are enforced; ids received from another
    /// host need not follow the local naming convention.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidCommitId` if the name is not a valid path
    /// component.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        check_component(&name)
            .map_err(|rule| TypeError::InvalidCommitId(format!("'{}' {}", name, rule)))?;
        Ok(Self(name))
    }

    /// Build the id for a commit of `branch` taken at `at`.
    pub fn for_branch(branch: &BranchName, at: DateTime<FixedOffset>) -> Self {
        Self(format!(
            "{}-{}",
            branch.as_str(),
            at.to_rfc3339_opts(SecondsFormat::Micros, false)
        ))
    }

    /// Split into the branch part and the timestamp part, if the id follows
    /// the `{branch}-{timestamp}` convention.
    fn split(&self) -> Option<(&str, DateTime<FixedOffset>)> {
        let cut = self.0.len().checked_sub(STAMP_LEN)?;
        if cut < 2 || !self.0.is_char_boundary(cut) {
            return None;
        }
        let (head, stamp) = self.0.split_at(cut);
        let branch = head.strip_suffix('-')?;
        let at = DateTime::parse_from_rfc3339(stamp).ok()?;
        Some((branch, at))
    }

    /// The branch this commit was taken from.
    pub fn branch(&self) -> Option<BranchName> {
        self.split().and_then(|(b, _)| BranchName::new(b).ok())
    }

    /// The wall-clock time encoded in the id.
    pub fn timestamp(&self) -> Option<DateTime<FixedOffset>> {
        self.split().map(|(_, at)| at)
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CommitId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl FromStr for CommitId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl From<CommitId> for String {
    fn from(id: CommitId) -> Self {
        id.0
    }
}

impl AsRef<str> for CommitId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CommitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Filesystem generation counter.
///
/// Assigned by the filesystem when a subvolume is created. It is the only
/// reliable total order between commits of one filesystem; it is not
/// derived from wall-clock time.
///
/// # Example
///
/// ```
/// use snaprepo::core::types::Generation;
///
/// let g: Generation = "42".parse().unwrap();
/// assert!(g > Generation::ZERO);
/// assert_eq!(g.to_string(), "42");
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    /// The lowest generation; a `log` from here returns everything.
    pub const ZERO: Generation = Generation(0);

    /// Wrap a raw generation number.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw generation number.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for Generation {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl FromStr for Generation {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| TypeError::InvalidGeneration(s.to_string()))
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    mod names {
        use super::*;

        #[test]
        fn valid_names() {
            assert!(RepoName::new("repoA").is_ok());
            assert!(RepoName::new("with.dot").is_ok());
            assert!(BranchName::new("feature-1").is_ok());
            assert!(BranchName::new("a").is_ok());
        }

        #[test]
        fn empty_rejected() {
            assert!(matches!(
                RepoName::new(""),
                Err(TypeError::InvalidRepoName(_))
            ));
            assert!(matches!(
                BranchName::new(""),
                Err(TypeError::InvalidBranchName(_))
            ));
        }

        #[test]
        fn dot_components_rejected() {
            assert!(RepoName::new(".").is_err());
            assert!(RepoName::new("..").is_err());
            assert!(BranchName::new("..").is_err());
        }

        #[test]
        fn slash_rejected() {
            assert!(RepoName::new("a/b").is_err());
            assert!(BranchName::new("/abs").is_err());
        }

        #[test]
        fn leading_dash_rejected() {
            let err = BranchName::new("-r").unwrap_err();
            assert!(err.to_string().contains("cannot start with '-'"));
        }

        #[test]
        fn control_chars_rejected() {
            assert!(BranchName::new("a\nb").is_err());
            assert!(BranchName::new("a\0b").is_err());
        }

        #[test]
        fn serde_roundtrip() {
            let branch = BranchName::new("feature").unwrap();
            let json = serde_json::to_string(&branch).unwrap();
            assert_eq!(json, "\"feature\"");
            let parsed: BranchName = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, branch);
        }

        #[test]
        fn serde_rejects_invalid() {
            let parsed: Result<RepoName, _> = serde_json::from_str("\"a/b\"");
            assert!(parsed.is_err());
        }

        #[test]
        fn master_constant() {
            assert_eq!(BranchName::master().as_str(), BranchName::MASTER);
        }
    }

    mod commit_id {
        use super::*;

        fn at(offset_hours: i32, micros: u32) -> DateTime<FixedOffset> {
            FixedOffset::east_opt(offset_hours * 3600)
                .unwrap()
                .with_ymd_and_hms(2024, 3, 9, 8, 7, 6)
                .unwrap()
                + chrono::Duration::microseconds(micros as i64)
        }

        #[test]
        fn format_has_microseconds_and_offset() {
            let id = CommitId::for_branch(&BranchName::master(), at(2, 15));
            assert_eq!(id.as_str(), "master-2024-03-09T08:07:06.000015+02:00");
        }

        #[test]
        fn negative_offset() {
            let id = CommitId::for_branch(&BranchName::master(), at(-7, 999_999));
            assert_eq!(id.as_str(), "master-2024-03-09T08:07:06.999999-07:00");
            assert_eq!(id.timestamp(), Some(at(-7, 999_999)));
        }

        #[test]
        fn branch_with_dashes_splits_on_stamp() {
            let branch = BranchName::new("feature-a-b").unwrap();
            let id = CommitId::for_branch(&branch, at(0, 1));
            assert_eq!(id.branch(), Some(branch));
        }

        #[test]
        fn foreign_names_have_no_branch() {
            let id = CommitId::new("imported").unwrap();
            assert_eq!(id.branch(), None);
            assert_eq!(id.timestamp(), None);
        }

        #[test]
        fn stamp_alone_has_no_branch() {
            let id = CommitId::new("2024-03-09T08:07:06.000015+02:00").unwrap();
            assert_eq!(id.branch(), None);
        }

        #[test]
        fn ordering_by_name_is_not_generation() {
            // Names compare lexically; this is identity, not history order.
            let a = CommitId::new("b-2024-01-01T00:00:00.000000+00:00").unwrap();
            let b = CommitId::new("a-2025-01-01T00:00:00.000000+00:00").unwrap();
            assert!(b < a);
        }
    }

    mod generation {
        use super::*;

        #[test]
        fn parse_and_display() {
            let g: Generation = "17".parse().unwrap();
            assert_eq!(g.get(), 17);
            assert_eq!(g.to_string(), "17");
        }

        #[test]
        fn parse_rejects_garbage() {
            assert!(matches!(
                "x1".parse::<Generation>(),
                Err(TypeError::InvalidGeneration(_))
            ));
            assert!("-1".parse::<Generation>().is_err());
        }

        #[test]
        fn ordering() {
            assert!(Generation::new(3) > Generation::new(2));
            assert_eq!(Generation::default(), Generation::ZERO);
        }
    }
}
