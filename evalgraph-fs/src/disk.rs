//! Adapter over the real disk

use crate::port::{Encoding, EntryKind, FileSystem, Metadata, TraversalFilter};
use crate::{FsError, Result};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::trace;

/// `FileSystem` backed by `std::fs`, with `tokio::fs` for the async forms
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskFileSystem;

impl DiskFileSystem {
    /// Create a disk adapter
    pub fn new() -> Self {
        Self
    }
}

fn to_metadata(meta: &fs::Metadata) -> Metadata {
    if meta.is_dir() {
        Metadata {
            kind: EntryKind::Directory,
            len: 0,
        }
    } else {
        Metadata {
            kind: EntryKind::File,
            len: meta.len(),
        }
    }
}

fn absent_is_none(path: &Path, result: std::io::Result<fs::Metadata>) -> Result<Option<Metadata>> {
    match result {
        Ok(meta) => Ok(Some(to_metadata(&meta))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(FsError::io(path, e)),
    }
}

#[async_trait]
impl FileSystem for DiskFileSystem {
    fn stat_sync(&self, path: &Path) -> Result<Option<Metadata>> {
        absent_is_none(path, fs::metadata(path))
    }

    fn read_directory_sync(&self, dir: &Path, filter: &TraversalFilter) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut pending = vec![dir.to_path_buf()];

        while let Some(current) = pending.pop() {
            let entries = fs::read_dir(&current).map_err(|e| FsError::io(&current, e))?;
            for entry in entries {
                let entry = entry.map_err(|e| FsError::io(&current, e))?;
                if filter.skips(&entry.file_name().to_string_lossy()) {
                    continue;
                }
                let path = entry.path();
                let file_type = entry.file_type().map_err(|e| FsError::io(&path, e))?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    files.push(path);
                } else if file_type.is_symlink() {
                    // Symlinked files are listed, symlinked directories are not descended
                    if let Ok(meta) = fs::metadata(&path) {
                        if meta.is_file() {
                            files.push(path);
                        }
                    }
                }
            }
        }

        files.sort();
        trace!("Listed {} files under {}", files.len(), dir.display());
        Ok(files)
    }

    fn resolve_symlink_sync(&self, path: &Path) -> Result<PathBuf> {
        fs::canonicalize(path).map_err(|e| FsError::io(path, e))
    }

    fn read_sync(&self, path: &Path, encoding: Encoding) -> Result<String> {
        let bytes = fs::read(path).map_err(|e| FsError::io(path, e))?;
        encoding.decode(path, bytes)
    }

    fn write_sync(&self, path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| FsError::io(parent, e))?;
        }
        fs::write(path, contents).map_err(|e| FsError::io(path, e))
    }

    fn remove_sync(&self, path: &Path) -> Result<()> {
        let meta = fs::symlink_metadata(path).map_err(|e| FsError::io(path, e))?;
        if meta.is_dir() {
            fs::remove_dir_all(path).map_err(|e| FsError::io(path, e))
        } else {
            fs::remove_file(path).map_err(|e| FsError::io(path, e))
        }
    }

    async fn stat(&self, path: &Path) -> Result<Option<Metadata>> {
        absent_is_none(path, tokio::fs::metadata(path).await)
    }

    async fn read_directory(&self, dir: &Path, filter: &TraversalFilter) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut pending = vec![dir.to_path_buf()];

        while let Some(current) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&current)
                .await
                .map_err(|e| FsError::io(&current, e))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| FsError::io(&current, e))?
            {
                if filter.skips(&entry.file_name().to_string_lossy()) {
                    continue;
                }
                let path = entry.path();
                let file_type = entry.file_type().await.map_err(|e| FsError::io(&path, e))?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    files.push(path);
                } else if file_type.is_symlink() {
                    if let Ok(meta) = tokio::fs::metadata(&path).await {
                        if meta.is_file() {
                            files.push(path);
                        }
                    }
                }
            }
        }

        files.sort();
        trace!("Listed {} files under {}", files.len(), dir.display());
        Ok(files)
    }

    async fn resolve_symlink(&self, path: &Path) -> Result<PathBuf> {
        tokio::fs::canonicalize(path)
            .await
            .map_err(|e| FsError::io(path, e))
    }

    async fn read(&self, path: &Path, encoding: Encoding) -> Result<String> {
        let bytes = tokio::fs::read(path).await.map_err(|e| FsError::io(path, e))?;
        encoding.decode(path, bytes)
    }

    async fn write(&self, path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FsError::io(parent, e))?;
        }
        tokio::fs::write(path, contents)
            .await
            .map_err(|e| FsError::io(path, e))
    }

    async fn remove(&self, path: &Path) -> Result<()> {
        let meta = tokio::fs::symlink_metadata(path)
            .await
            .map_err(|e| FsError::io(path, e))?;
        if meta.is_dir() {
            tokio::fs::remove_dir_all(path)
                .await
                .map_err(|e| FsError::io(path, e))
        } else {
            tokio::fs::remove_file(path)
                .await
                .map_err(|e| FsError::io(path, e))
        }
    }
}
