//! repo::entry
//!
//! Result types of repository operations.

use std::path::PathBuf;

use serde::Serialize;

use crate::btrfs::SubvolumeEntry;
use crate::core::types::{BranchName, CommitId, Generation, TypeError};

/// One commit in a repository's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitEntry {
    /// Commit id (the snapshot's directory name)
    pub id: CommitId,
    /// Creation generation; the history order
    pub generation: Generation,
    /// Branch the commit was taken from, when the id follows the
    /// `{branch}-{timestamp}` convention
    pub branch: Option<BranchName>,
}

impl CommitEntry {
    /// Build from a listing entry below `{repo}/commits`.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidCommitId` if the entry's name is not a
    /// usable commit id.
    pub fn from_subvolume(entry: &SubvolumeEntry) -> Result<Self, TypeError> {
        let name = entry
            .name()
            .ok_or_else(|| TypeError::InvalidCommitId(entry.path.display().to_string()))?;
        let id = CommitId::new(name)?;
        let branch = id.branch();
        Ok(Self {
            id,
            generation: entry.generation(),
            branch,
        })
    }
}

/// What [`crate::repo::RepoStore::init`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    /// Logical names of subvolumes created by this call, in creation order
    pub created: Vec<PathBuf>,
    /// Logical names that already existed and were left alone
    pub existing: Vec<PathBuf>,
}

impl InitReport {
    /// Whether this call created the whole skeleton.
    pub fn is_fresh(&self) -> bool {
        self.existing.is_empty()
    }

    /// Whether the repository was already complete.
    pub fn was_complete(&self) -> bool {
        self.created.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::btrfs::listing::parse_line;

    #[test]
    fn from_conventional_name() {
        let line = concat!(
            "ID 300 gen 40 cgen 21 top level 5 ",
            "path ns/r/commits/master-2024-01-02T03:04:05.000006+00:00",
        );
        let entry = parse_line(line).unwrap();
        let commit = CommitEntry::from_subvolume(&entry).unwrap();
        assert_eq!(commit.generation, Generation::new(21));
        assert_eq!(commit.branch, Some(BranchName::master()));
        assert_eq!(
            commit.id.as_str(),
            "master-2024-01-02T03:04:05.000006+00:00"
        );
    }

    #[test]
    fn from_foreign_name() {
        let entry = parse_line("ID 300 gen 40 top level 5 path ns/r/commits/imported").unwrap();
        let commit = CommitEntry::from_subvolume(&entry).unwrap();
        assert_eq!(commit.branch, None);
        assert_eq!(commit.generation, Generation::new(40));
    }

    #[test]
    fn serializes_to_json() {
        let commit = CommitEntry {
            id: CommitId::new("c").unwrap(),
            generation: Generation::new(3),
            branch: None,
        };
        let json = serde_json::to_string(&commit).unwrap();
        assert_eq!(json, r#"{"id":"c","generation":3,"branch":null}"#);
    }

    #[test]
    fn init_report_flags() {
        let fresh = InitReport {
            created: vec!["r".into()],
            existing: vec![],
        };
        assert!(fresh.is_fresh());
        assert!(!fresh.was_complete());

        let complete = InitReport {
            created: vec![],
            existing: vec!["r".into()],
        };
        assert!(!complete.is_fresh());
        assert!(complete.was_complete());
    }
}
