//! files
//!
//! Plain file operations addressed by logical name.
//!
//! [`NamespacedFiles`] resolves every name through [`FsPaths`] and then
//! does ordinary filesystem I/O. It never invokes the snapshot tool; use
//! it to populate branch working directories and to inspect commits.
//!
//! # Example
//!
//! ```no_run
//! use snaprepo::core::namespace::Namespace;
//! use snaprepo::core::paths::FsPaths;
//! use snaprepo::files::NamespacedFiles;
//!
//! let files = NamespacedFiles::new(FsPaths::new("/var/lib/pfs/vol", Namespace::new("ns")?));
//! files.create_from_reader("repo/branches/master/greeting", &b"hello\n"[..])?;
//! assert!(files.file_exists("repo/branches/master/greeting")?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::ffi::OsString;
use std::fs::{self, File, Metadata, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::core::paths::FsPaths;

/// A failed file operation.
#[derive(Debug, Error)]
#[error("{op} {path}: {source}")]
pub struct FileError {
    /// Operation name
    pub op: &'static str,
    /// Absolute path involved
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl FileError {
    fn new(op: &'static str, path: &Path, source: io::Error) -> Self {
        Self {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    /// The underlying I/O error kind.
    pub fn kind(&self) -> io::ErrorKind {
        self.source.kind()
    }
}

/// One directory entry from [`NamespacedFiles::read_dir`].
#[derive(Debug, Clone)]
pub struct FileInfo {
    /// Entry name
    pub name: OsString,
    /// Metadata of the entry itself (symlinks are not followed)
    pub metadata: Metadata,
}

/// File operations inside one namespace.
#[derive(Debug, Clone)]
pub struct NamespacedFiles {
    paths: FsPaths,
}

impl NamespacedFiles {
    /// File access scoped to the namespace of `paths`.
    pub fn new(paths: FsPaths) -> Self {
        Self { paths }
    }

    /// The path resolver.
    pub fn paths(&self) -> &FsPaths {
        &self.paths
    }

    fn resolve(&self, name: impl AsRef<Path>) -> PathBuf {
        self.paths.file_path(name)
    }

    /// Create or truncate a file for writing.
    pub fn create(&self, name: impl AsRef<Path>) -> Result<File, FileError> {
        let path = self.resolve(name);
        File::create(&path).map_err(|e| FileError::new("create", &path, e))
    }

    /// Create or truncate a file and fill it from `reader`.
    ///
    /// Returns the number of bytes written.
    pub fn create_from_reader<R: Read>(
        &self,
        name: impl AsRef<Path>,
        mut reader: R,
    ) -> Result<u64, FileError> {
        let path = self.resolve(name);
        let mut file = File::create(&path).map_err(|e| FileError::new("create", &path, e))?;
        io::copy(&mut reader, &mut file).map_err(|e| FileError::new("write", &path, e))
    }

    /// Open a file read-only.
    pub fn open(&self, name: impl AsRef<Path>) -> Result<File, FileError> {
        let path = self.resolve(name);
        File::open(&path).map_err(|e| FileError::new("open", &path, e))
    }

    /// Open a file with explicit options.
    pub fn open_file(
        &self,
        name: impl AsRef<Path>,
        options: &OpenOptions,
    ) -> Result<File, FileError> {
        let path = self.resolve(name);
        options
            .open(&path)
            .map_err(|e| FileError::new("open", &path, e))
    }

    /// Overwrite an existing file with the content of `reader`.
    ///
    /// Unlike [`NamespacedFiles::create_from_reader`] the file must already
    /// exist. Returns the number of bytes written.
    pub fn write_file<R: Read>(
        &self,
        name: impl AsRef<Path>,
        mut reader: R,
    ) -> Result<u64, FileError> {
        let path = self.resolve(name);
        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| FileError::new("open", &path, e))?;
        io::copy(&mut reader, &mut file).map_err(|e| FileError::new("write", &path, e))
    }

    /// Remove a file or an empty directory.
    pub fn remove(&self, name: impl AsRef<Path>) -> Result<(), FileError> {
        let path = self.resolve(name);
        let meta = fs::symlink_metadata(&path).map_err(|e| FileError::new("remove", &path, e))?;
        let result = if meta.is_dir() {
            fs::remove_dir(&path)
        } else {
            fs::remove_file(&path)
        };
        result.map_err(|e| FileError::new("remove", &path, e))
    }

    /// Whether `name` exists (following symlinks).
    pub fn file_exists(&self, name: impl AsRef<Path>) -> Result<bool, FileError> {
        let path = self.resolve(name);
        match fs::metadata(&path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(FileError::new("stat", &path, e)),
        }
    }

    /// Create a single directory.
    pub fn mkdir(&self, name: impl AsRef<Path>) -> Result<(), FileError> {
        let path = self.resolve(name);
        fs::create_dir(&path).map_err(|e| FileError::new("mkdir", &path, e))
    }

    /// Create a directory and any missing parents.
    pub fn mkdir_all(&self, name: impl AsRef<Path>) -> Result<(), FileError> {
        let path = self.resolve(name);
        fs::create_dir_all(&path).map_err(|e| FileError::new("mkdir", &path, e))
    }

    /// Hard-link `new` to `old`.
    pub fn link(&self, old: impl AsRef<Path>, new: impl AsRef<Path>) -> Result<(), FileError> {
        let old = self.resolve(old);
        let new = self.resolve(new);
        fs::hard_link(&old, &new).map_err(|e| FileError::new("link", &new, e))
    }

    /// Create a symlink at `new` pointing at the absolute path of `old`.
    #[cfg(unix)]
    pub fn symlink(&self, old: impl AsRef<Path>, new: impl AsRef<Path>) -> Result<(), FileError> {
        let old = self.resolve(old);
        let new = self.resolve(new);
        debug!(from = %old.display(), link = %new.display(), "symlink");
        std::os::unix::fs::symlink(&old, &new).map_err(|e| FileError::new("symlink", &new, e))
    }

    /// Read a symlink, returning its target with the namespace prefix
    /// removed.
    ///
    /// Targets outside the namespace are returned unchanged.
    pub fn readlink(&self, name: impl AsRef<Path>) -> Result<PathBuf, FileError> {
        let path = self.resolve(name);
        let target = fs::read_link(&path).map_err(|e| FileError::new("readlink", &path, e))?;
        Ok(self.paths.trim_file_path(&target).to_path_buf())
    }

    /// Entries of a directory, sorted by name.
    pub fn read_dir(&self, name: impl AsRef<Path>) -> Result<Vec<FileInfo>, FileError> {
        let path = self.resolve(name);
        let mut infos = Vec::new();
        for entry in fs::read_dir(&path).map_err(|e| FileError::new("readdir", &path, e))? {
            let entry = entry.map_err(|e| FileError::new("readdir", &path, e))?;
            let entry_path = entry.path();
            let metadata = fs::symlink_metadata(&entry_path)
                .map_err(|e| FileError::new("stat", &entry_path, e))?;
            infos.push(FileInfo {
                name: entry.file_name(),
                metadata,
            });
        }
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(infos)
    }
}
