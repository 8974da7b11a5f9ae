//! btrfs::listing
//!
//! Parser for `btrfs subvolume list` output.
//!
//! Each line is a run of key/value pairs followed by the path, which runs
//! to the end of the line and may contain spaces:
//!
//! ```text
//! ID 258 gen 12 cgen 11 top level 257 path ns/repo/commits/master-...
//! ID 259 gen 14 cgen 14 parent 257 top level 257 otime 2024-01-02 10:00:00 uuid 7b... path ...
//! ```
//!
//! Which keys appear depends on the flags passed to the tool; only `ID`,
//! `gen`, `top level` and `path` are required. Unknown keys are skipped so
//! newer tool versions keep parsing.

use std::io::BufRead;
use std::path::PathBuf;

use thiserror::Error;

use crate::core::types::Generation;

/// Prefix the tool puts on paths outside the listed subvolume's tree.
const FS_TREE_PREFIX: &str = "<FS_TREE>/";

/// Errors from listing parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListingError {
    #[error("malformed subvolume listing line ({reason}): {line}")]
    Malformed {
        /// The offending line
        line: String,
        /// What was wrong with it
        reason: String,
    },
}

/// One subvolume from a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubvolumeEntry {
    /// Subvolume id
    pub id: u64,
    /// Generation of the last modification
    pub gen: Generation,
    /// Generation at creation (`-c`)
    pub cgen: Option<Generation>,
    /// Parent subvolume id (`-p`)
    pub parent: Option<u64>,
    /// Id of the containing tree
    pub top_level: u64,
    /// Creation time as printed by the tool (`-s`)
    pub otime: Option<String>,
    /// Subvolume uuid (`-u`)
    pub uuid: Option<String>,
    /// Parent uuid (`-q`)
    pub parent_uuid: Option<String>,
    /// Received uuid (`-R`)
    pub received_uuid: Option<String>,
    /// Path relative to the filesystem top level
    pub path: PathBuf,
}

impl SubvolumeEntry {
    /// The creation generation, falling back to `gen` when the listing did
    /// not include `cgen`.
    pub fn generation(&self) -> Generation {
        self.cgen.unwrap_or(self.gen)
    }

    /// Final path component.
    pub fn name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }
}

fn malformed(line: &str, reason: impl Into<String>) -> ListingError {
    ListingError::Malformed {
        line: line.to_string(),
        reason: reason.into(),
    }
}

/// Parse a single listing line.
///
/// # Example
///
/// ```
/// use snaprepo::btrfs::listing::parse_line;
///
/// let e = parse_line("ID 258 gen 12 cgen 11 top level 5 path ns/r/commits/c").unwrap();
/// assert_eq!(e.id, 258);
/// assert_eq!(e.generation().get(), 11);
/// assert_eq!(e.name(), Some("c"));
/// ```
pub fn parse_line(line: &str) -> Result<SubvolumeEntry, ListingError> {
    let line = line.trim_end_matches(['\r', '\n']);

    let (head, path) = if let Some(rest) = line.strip_prefix("path ") {
        ("", rest)
    } else {
        match line.find(" path ") {
            Some(idx) => (&line[..idx], &line[idx + " path ".len()..]),
            None => return Err(malformed(line, "missing path")),
        }
    };
    if path.is_empty() {
        return Err(malformed(line, "empty path"));
    }
    let path = path.strip_prefix(FS_TREE_PREFIX).unwrap_or(path);

    let mut id = None;
    let mut gen = None;
    let mut cgen = None;
    let mut parent = None;
    let mut top_level = None;
    let mut otime = None;
    let mut uuid = None;
    let mut parent_uuid = None;
    let mut received_uuid = None;

    let number = |token: Option<&str>, key: &str| -> Result<u64, ListingError> {
        token
            .ok_or_else(|| malformed(line, format!("missing value for '{}'", key)))?
            .parse::<u64>()
            .map_err(|_| malformed(line, format!("non-numeric '{}'", key)))
    };
    let text = |token: Option<&str>, key: &str| -> Result<String, ListingError> {
        token
            .map(str::to_string)
            .ok_or_else(|| malformed(line, format!("missing value for '{}'", key)))
    };

    let mut tokens = head.split_whitespace();
    while let Some(key) = tokens.next() {
        match key {
            "ID" => id = Some(number(tokens.next(), key)?),
            "gen" => gen = Some(Generation::new(number(tokens.next(), key)?)),
            "cgen" | "ogen" => cgen = Some(Generation::new(number(tokens.next(), key)?)),
            "parent" => parent = Some(number(tokens.next(), key)?),
            "top" => {
                if tokens.next() != Some("level") {
                    return Err(malformed(line, "expected 'top level'"));
                }
                top_level = Some(number(tokens.next(), "top level")?);
            }
            "otime" => {
                let date = text(tokens.next(), key)?;
                // "-" stands for an unknown time and has no second token.
                otime = if date == "-" {
                    None
                } else {
                    Some(format!("{} {}", date, text(tokens.next(), key)?))
                };
            }
            "uuid" => uuid = Some(text(tokens.next(), key)?),
            "parent_uuid" => parent_uuid = Some(text(tokens.next(), key)?),
            "received_uuid" => received_uuid = Some(text(tokens.next(), key)?),
            _ => {
                tokens.next();
            }
        }
    }

    Ok(SubvolumeEntry {
        id: id.ok_or_else(|| malformed(line, "missing ID"))?,
        gen: gen.ok_or_else(|| malformed(line, "missing gen"))?,
        cgen,
        parent,
        top_level: top_level.ok_or_else(|| malformed(line, "missing top level"))?,
        otime,
        uuid: uuid.filter(|u| u != "-"),
        parent_uuid: parent_uuid.filter(|u| u != "-"),
        received_uuid: received_uuid.filter(|u| u != "-"),
        path: PathBuf::from(path),
    })
}

/// Parse every non-blank line of a listing.
pub fn parse_listing(text: &str) -> Result<Vec<SubvolumeEntry>, ListingError> {
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .map(parse_line)
        .collect()
}

/// Read a listing from a stream into raw lines.
///
/// Used inside streaming handlers, where parse errors are reported after
/// the process has exited.
pub fn read_lines<R: BufRead>(reader: R) -> std::io::Result<Vec<String>> {
    let mut lines = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if !line.trim().is_empty() {
            lines.push(line);
        }
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_line() {
        let e = parse_line("ID 256 gen 7 top level 5 path vol").unwrap();
        assert_eq!(e.id, 256);
        assert_eq!(e.gen, Generation::new(7));
        assert_eq!(e.cgen, None);
        assert_eq!(e.generation(), Generation::new(7));
        assert_eq!(e.top_level, 5);
        assert_eq!(e.path, PathBuf::from("vol"));
    }

    #[test]
    fn creation_generation_preferred() {
        let e = parse_line("ID 258 gen 30 cgen 12 top level 257 path ns/r/commits/a").unwrap();
        assert_eq!(e.generation(), Generation::new(12));
        assert_eq!(e.name(), Some("a"));
    }

    #[test]
    fn full_line() {
        let line = "ID 259 gen 14 cgen 14 parent 257 top level 257 \
                    otime 2024-01-02 10:00:00 parent_uuid - received_uuid - \
                    uuid 7b3c1f2e-0000-4000-8000-000000000001 path ns/r/commits/master-x";
        let e = parse_line(line).unwrap();
        assert_eq!(e.parent, Some(257));
        assert_eq!(e.otime.as_deref(), Some("2024-01-02 10:00:00"));
        assert_eq!(e.uuid.as_deref(), Some("7b3c1f2e-0000-4000-8000-000000000001"));
        assert_eq!(e.parent_uuid, None);
        assert_eq!(e.received_uuid, None);
    }

    #[test]
    fn unknown_otime() {
        let e = parse_line("ID 5 gen 1 top level 0 otime - path x").unwrap();
        assert_eq!(e.otime, None);
    }

    #[test]
    fn path_with_spaces() {
        let e = parse_line("ID 260 gen 3 top level 5 path a dir/with path/inside").unwrap();
        assert_eq!(e.path, PathBuf::from("a dir/with path/inside"));
    }

    #[test]
    fn fs_tree_prefix_stripped() {
        let e = parse_line("ID 260 gen 3 top level 5 path <FS_TREE>/ns/r/commits/c").unwrap();
        assert_eq!(e.path, PathBuf::from("ns/r/commits/c"));
    }

    #[test]
    fn unknown_keys_skipped() {
        let e = parse_line("ID 9 gen 2 flags 0x1 top level 5 path p").unwrap();
        assert_eq!(e.id, 9);
    }

    #[test]
    fn missing_path_rejected() {
        let err = parse_line("ID 9 gen 2 top level 5").unwrap_err();
        assert!(err.to_string().contains("missing path"));
    }

    #[test]
    fn missing_id_rejected() {
        assert!(parse_line("gen 2 top level 5 path p").is_err());
    }

    #[test]
    fn non_numeric_rejected() {
        let err = parse_line("ID x gen 2 top level 5 path p").unwrap_err();
        assert!(err.to_string().contains("non-numeric 'ID'"));
    }

    #[test]
    fn broken_top_level_rejected() {
        assert!(parse_line("ID 1 gen 2 top 5 path p").is_err());
    }

    #[test]
    fn listing_skips_blank_lines() {
        let text = "ID 2 gen 5 top level 5 path b\n\nID 1 gen 4 top level 5 path a\n";
        let entries = parse_listing(text).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, 2);
        assert_eq!(entries[1].id, 1);
    }

    #[test]
    fn read_lines_from_stream() {
        let mut input = std::io::Cursor::new(b"ID 1 gen 1 top level 5 path a\n\n".to_vec());
        let lines = read_lines(&mut input).unwrap();
        assert_eq!(lines, vec!["ID 1 gen 1 top level 5 path a".to_string()]);
    }
}
