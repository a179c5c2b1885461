//! Directory-entry cache layer
//!
//! Memoizes `stat` and recursive listings in front of another adapter.
//! Mutations made through this layer invalidate the affected entries.

use crate::port::{Encoding, FileSystem, Metadata, TraversalFilter};
use crate::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::trace;

/// `FileSystem` wrapper caching stats and listings
#[derive(Debug)]
pub struct CachedFileSystem {
    inner: Arc<dyn FileSystem>,
    stats: RwLock<FxHashMap<PathBuf, Option<Metadata>>>,
    listings: RwLock<FxHashMap<(PathBuf, TraversalFilter), Vec<PathBuf>>>,
}

impl CachedFileSystem {
    /// Wrap `inner`
    pub fn new(inner: Arc<dyn FileSystem>) -> Self {
        Self {
            inner,
            stats: RwLock::new(FxHashMap::default()),
            listings: RwLock::new(FxHashMap::default()),
        }
    }

    /// Number of memoized stat results
    pub fn cached_stats(&self) -> usize {
        self.stats.read().len()
    }

    /// Forget everything
    pub fn clear(&self) {
        self.stats.write().clear();
        self.listings.write().clear();
    }

    fn invalidate(&self, path: &Path) {
        self.stats
            .write()
            .retain(|p, _| !p.starts_with(path) && !path.starts_with(p));
        self.listings
            .write()
            .retain(|(dir, _), _| !path.starts_with(dir) && !dir.starts_with(path));
        trace!("Invalidated cached entries for {}", path.display());
    }

    fn cached_stat(&self, path: &Path) -> Option<Option<Metadata>> {
        self.stats.read().get(path).copied()
    }

    fn cached_listing(&self, dir: &Path, filter: &TraversalFilter) -> Option<Vec<PathBuf>> {
        self.listings
            .read()
            .get(&(dir.to_path_buf(), filter.clone()))
            .cloned()
    }
}

#[async_trait]
impl FileSystem for CachedFileSystem {
    fn stat_sync(&self, path: &Path) -> Result<Option<Metadata>> {
        if let Some(hit) = self.cached_stat(path) {
            return Ok(hit);
        }
        let meta = self.inner.stat_sync(path)?;
        self.stats.write().insert(path.to_path_buf(), meta);
        Ok(meta)
    }

    fn read_directory_sync(&self, dir: &Path, filter: &TraversalFilter) -> Result<Vec<PathBuf>> {
        if let Some(hit) = self.cached_listing(dir, filter) {
            return Ok(hit);
        }
        let files = self.inner.read_directory_sync(dir, filter)?;
        self.listings
            .write()
            .insert((dir.to_path_buf(), filter.clone()), files.clone());
        Ok(files)
    }

    fn resolve_symlink_sync(&self, path: &Path) -> Result<PathBuf> {
        self.inner.resolve_symlink_sync(path)
    }

    fn read_sync(&self, path: &Path, encoding: Encoding) -> Result<String> {
        self.inner.read_sync(path, encoding)
    }

    fn write_sync(&self, path: &Path, contents: &str) -> Result<()> {
        self.invalidate(path);
        self.inner.write_sync(path, contents)
    }

    fn remove_sync(&self, path: &Path) -> Result<()> {
        self.invalidate(path);
        self.inner.remove_sync(path)
    }

    async fn stat(&self, path: &Path) -> Result<Option<Metadata>> {
        if let Some(hit) = self.cached_stat(path) {
            return Ok(hit);
        }
        let meta = self.inner.stat(path).await?;
        self.stats.write().insert(path.to_path_buf(), meta);
        Ok(meta)
    }

    async fn read_directory(&self, dir: &Path, filter: &TraversalFilter) -> Result<Vec<PathBuf>> {
        if let Some(hit) = self.cached_listing(dir, filter) {
            return Ok(hit);
        }
        let files = self.inner.read_directory(dir, filter).await?;
        self.listings
            .write()
            .insert((dir.to_path_buf(), filter.clone()), files.clone());
        Ok(files)
    }

    async fn resolve_symlink(&self, path: &Path) -> Result<PathBuf> {
        self.inner.resolve_symlink(path).await
    }

    async fn read(&self, path: &Path, encoding: Encoding) -> Result<String> {
        self.inner.read(path, encoding).await
    }

    async fn write(&self, path: &Path, contents: &str) -> Result<()> {
        self.invalidate(path);
        self.inner.write(path, contents).await
    }

    async fn remove(&self, path: &Path) -> Result<()> {
        self.invalidate(path);
        self.inner.remove(path).await
    }
}
