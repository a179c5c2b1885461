//! The file system port consumed by the resolver

use crate::{FsError, Result};
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};

/// Kind of a directory entry, after following symlinks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
}

/// Result of a `stat`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    /// Entry kind
    pub kind: EntryKind,
    /// Size in bytes (zero for directories)
    pub len: u64,
}

impl Metadata {
    /// Whether the entry is a regular file
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// Whether the entry is a directory
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Text encodings accepted by `read`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// UTF-8, rejecting invalid sequences
    #[default]
    Utf8,
    /// ISO-8859-1, every byte maps to one char
    Latin1,
}

impl Encoding {
    /// Decode raw bytes read from `path`
    pub fn decode(self, path: &Path, bytes: Vec<u8>) -> Result<String> {
        match self {
            Encoding::Utf8 => String::from_utf8(bytes).map_err(|_| FsError::InvalidEncoding {
                path: path.to_path_buf(),
                encoding: "utf-8",
            }),
            Encoding::Latin1 => Ok(bytes.into_iter().map(char::from).collect()),
        }
    }
}

/// Which path segments a recursive listing skips
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraversalFilter {
    /// Name of the dependency vendor directory
    pub vendor_dir: String,
}

impl TraversalFilter {
    /// Filter skipping dot-prefixed segments and `vendor_dir`
    pub fn new(vendor_dir: impl Into<String>) -> Self {
        Self {
            vendor_dir: vendor_dir.into(),
        }
    }

    /// Whether a single path segment is excluded from traversal
    pub fn skips(&self, segment: &str) -> bool {
        segment.starts_with('.') || segment == self.vendor_dir
    }

    /// Whether any segment of `relative` is excluded
    pub fn skips_path(&self, relative: &Path) -> bool {
        relative
            .components()
            .any(|c| self.skips(&c.as_os_str().to_string_lossy()))
    }
}

/// File system operations the resolver needs, in sync and async form
///
/// The async methods default to their sync counterparts; adapters with a
/// native async implementation override them.
#[async_trait]
pub trait FileSystem: Send + Sync + fmt::Debug {
    /// Kind and size of `path` after following symlinks, `None` if absent
    fn stat_sync(&self, path: &Path) -> Result<Option<Metadata>>;

    /// Every file below `dir`, recursively, sorted, honouring `filter`
    fn read_directory_sync(&self, dir: &Path, filter: &TraversalFilter) -> Result<Vec<PathBuf>>;

    /// Canonical path of `path` with every symlink resolved
    fn resolve_symlink_sync(&self, path: &Path) -> Result<PathBuf>;

    /// Whole file as text
    fn read_sync(&self, path: &Path, encoding: Encoding) -> Result<String>;

    /// Replace the file's content, creating parent directories first
    fn write_sync(&self, path: &Path, contents: &str) -> Result<()>;

    /// Delete a file or a directory tree
    fn remove_sync(&self, path: &Path) -> Result<()>;

    /// Async form of `stat_sync`
    async fn stat(&self, path: &Path) -> Result<Option<Metadata>> {
        self.stat_sync(path)
    }

    /// Async form of `read_directory_sync`
    async fn read_directory(&self, dir: &Path, filter: &TraversalFilter) -> Result<Vec<PathBuf>> {
        self.read_directory_sync(dir, filter)
    }

    /// Async form of `resolve_symlink_sync`
    async fn resolve_symlink(&self, path: &Path) -> Result<PathBuf> {
        self.resolve_symlink_sync(path)
    }

    /// Async form of `read_sync`
    async fn read(&self, path: &Path, encoding: Encoding) -> Result<String> {
        self.read_sync(path, encoding)
    }

    /// Async form of `write_sync`
    async fn write(&self, path: &Path, contents: &str) -> Result<()> {
        self.write_sync(path, contents)
    }

    /// Async form of `remove_sync`
    async fn remove(&self, path: &Path) -> Result<()> {
        self.remove_sync(path)
    }

    /// Whether `path` is an existing regular file
    async fn is_file(&self, path: &Path) -> bool {
        matches!(self.stat(path).await, Ok(Some(meta)) if meta.is_file())
    }
}
