//! In-memory file system
//!
//! Used by tests and by embedders that analyze generated sources. Supports
//! symlinks and counts every operation so callers can assert how much work a
//! resolution performed.

use crate::path::normalize;
use crate::port::{Encoding, EntryKind, FileSystem, Metadata, TraversalFilter};
use crate::{FsError, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, VecDeque};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

const MAX_SYMLINK_HOPS: usize = 40;

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File(Vec<u8>),
    Symlink(PathBuf),
}

/// Snapshot of the operation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FsOpCounts {
    /// `stat` calls
    pub stat: usize,
    /// `read_directory` calls
    pub read_directory: usize,
    /// `resolve_symlink` calls
    pub resolve_symlink: usize,
    /// `read` calls
    pub read: usize,
    /// `write` calls
    pub write: usize,
    /// `remove` calls
    pub remove: usize,
}

#[derive(Debug, Default)]
struct Counters {
    stat: AtomicUsize,
    read_directory: AtomicUsize,
    resolve_symlink: AtomicUsize,
    read: AtomicUsize,
    write: AtomicUsize,
    remove: AtomicUsize,
}

/// `FileSystem` holding its whole tree in memory
///
/// Async operations yield to the executor once before completing so that
/// concurrent requests interleave the way they would against a real disk.
#[derive(Debug)]
pub struct MemoryFileSystem {
    nodes: RwLock<BTreeMap<PathBuf, Node>>,
    counters: Counters,
}

impl Default for MemoryFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFileSystem {
    /// Create an empty tree containing only `/`
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(PathBuf::from("/"), Node::Dir);
        Self {
            nodes: RwLock::new(nodes),
            counters: Counters::default(),
        }
    }

    /// Add a text file, creating missing parent directories
    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl Into<String>) -> &Self {
        let path = normalize(path.as_ref());
        let mut nodes = self.nodes.write();
        Self::ensure_parents(&mut nodes, &path);
        nodes.insert(path, Node::File(contents.into().into_bytes()));
        self
    }

    /// Add an empty directory
    pub fn add_dir(&self, path: impl AsRef<Path>) -> &Self {
        let path = normalize(path.as_ref());
        let mut nodes = self.nodes.write();
        Self::ensure_parents(&mut nodes, &path);
        nodes.insert(path, Node::Dir);
        self
    }

    /// Add a symlink at `link` pointing to `target`
    ///
    /// A relative target is interpreted against the link's directory.
    pub fn add_symlink(&self, link: impl AsRef<Path>, target: impl AsRef<Path>) -> &Self {
        let link = normalize(link.as_ref());
        let mut nodes = self.nodes.write();
        Self::ensure_parents(&mut nodes, &link);
        nodes.insert(link, Node::Symlink(target.as_ref().to_path_buf()));
        self
    }

    /// Current operation counters
    pub fn op_counts(&self) -> FsOpCounts {
        FsOpCounts {
            stat: self.counters.stat.load(Ordering::SeqCst),
            read_directory: self.counters.read_directory.load(Ordering::SeqCst),
            resolve_symlink: self.counters.resolve_symlink.load(Ordering::SeqCst),
            read: self.counters.read.load(Ordering::SeqCst),
            write: self.counters.write.load(Ordering::SeqCst),
            remove: self.counters.remove.load(Ordering::SeqCst),
        }
    }

    fn ensure_parents(nodes: &mut BTreeMap<PathBuf, Node>, path: &Path) {
        for ancestor in path.ancestors().skip(1) {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            nodes.entry(ancestor.to_path_buf()).or_insert(Node::Dir);
        }
    }

    fn canonical(nodes: &BTreeMap<PathBuf, Node>, path: &Path) -> Result<PathBuf> {
        let mut queue: VecDeque<PathBuf> = Self::segments(&normalize(path));
        let mut resolved = PathBuf::from("/");
        let mut hops = 0;

        while let Some(segment) = queue.pop_front() {
            let candidate = resolved.join(&segment);
            match nodes.get(&candidate) {
                Some(Node::Symlink(target)) => {
                    hops += 1;
                    if hops > MAX_SYMLINK_HOPS {
                        return Err(FsError::SymlinkLoop {
                            path: path.to_path_buf(),
                        });
                    }
                    let target = normalize(&resolved.join(target));
                    let mut restarted = Self::segments(&target);
                    restarted.extend(queue.drain(..));
                    queue = restarted;
                    resolved = PathBuf::from("/");
                }
                Some(_) => resolved = candidate,
                None => {
                    return Err(FsError::NotFound {
                        path: path.to_path_buf(),
                    })
                }
            }
        }

        Ok(resolved)
    }

    fn segments(path: &Path) -> VecDeque<PathBuf> {
        path.components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(PathBuf::from(s)),
                _ => None,
            })
            .collect()
    }

    fn lookup(&self, path: &Path) -> Result<(PathBuf, Node)> {
        let nodes = self.nodes.read();
        let canonical = Self::canonical(&nodes, path)?;
        let node = nodes
            .get(&canonical)
            .cloned()
            .ok_or_else(|| FsError::NotFound {
                path: path.to_path_buf(),
            })?;
        Ok((canonical, node))
    }
}

#[async_trait]
impl FileSystem for MemoryFileSystem {
    fn stat_sync(&self, path: &Path) -> Result<Option<Metadata>> {
        self.counters.stat.fetch_add(1, Ordering::SeqCst);
        match self.lookup(path) {
            Ok((_, Node::File(bytes))) => Ok(Some(Metadata {
                kind: EntryKind::File,
                len: bytes.len() as u64,
            })),
            Ok(_) => Ok(Some(Metadata {
                kind: EntryKind::Directory,
                len: 0,
            })),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn read_directory_sync(&self, dir: &Path, filter: &TraversalFilter) -> Result<Vec<PathBuf>> {
        self.counters.read_directory.fetch_add(1, Ordering::SeqCst);
        let (canonical, node) = self.lookup(dir)?;
        if !matches!(node, Node::Dir) {
            return Err(FsError::WrongKind {
                path: dir.to_path_buf(),
                expected: "directory",
            });
        }

        let nodes = self.nodes.read();
        let mut files = Vec::new();
        for (path, node) in nodes.range(canonical.clone()..) {
            let Ok(relative) = path.strip_prefix(&canonical) else {
                break;
            };
            if relative.as_os_str().is_empty() || filter.skips_path(relative) {
                continue;
            }
            let is_file = match node {
                Node::File(_) => true,
                Node::Symlink(_) => matches!(
                    Self::canonical(&nodes, path).map(|c| nodes.get(&c).cloned()),
                    Ok(Some(Node::File(_)))
                ),
                Node::Dir => false,
            };
            if is_file {
                files.push(normalize(dir).join(relative));
            }
        }

        files.sort();
        Ok(files)
    }

    fn resolve_symlink_sync(&self, path: &Path) -> Result<PathBuf> {
        self.counters.resolve_symlink.fetch_add(1, Ordering::SeqCst);
        let nodes = self.nodes.read();
        Self::canonical(&nodes, path)
    }

    fn read_sync(&self, path: &Path, encoding: Encoding) -> Result<String> {
        self.counters.read.fetch_add(1, Ordering::SeqCst);
        match self.lookup(path)? {
            (_, Node::File(bytes)) => encoding.decode(path, bytes),
            _ => Err(FsError::WrongKind {
                path: path.to_path_buf(),
                expected: "file",
            }),
        }
    }

    fn write_sync(&self, path: &Path, contents: &str) -> Result<()> {
        self.counters.write.fetch_add(1, Ordering::SeqCst);
        self.add_file(path, contents);
        Ok(())
    }

    fn remove_sync(&self, path: &Path) -> Result<()> {
        self.counters.remove.fetch_add(1, Ordering::SeqCst);
        let path = normalize(path);
        let mut nodes = self.nodes.write();
        if !nodes.contains_key(&path) {
            return Err(FsError::NotFound { path });
        }
        nodes.retain(|p, _| !p.starts_with(&path));
        Ok(())
    }

    async fn stat(&self, path: &Path) -> Result<Option<Metadata>> {
        tokio::task::yield_now().await;
        self.stat_sync(path)
    }

    async fn read_directory(&self, dir: &Path, filter: &TraversalFilter) -> Result<Vec<PathBuf>> {
        tokio::task::yield_now().await;
        self.read_directory_sync(dir, filter)
    }

    async fn resolve_symlink(&self, path: &Path) -> Result<PathBuf> {
        tokio::task::yield_now().await;
        self.resolve_symlink_sync(path)
    }

    async fn read(&self, path: &Path, encoding: Encoding) -> Result<String> {
        tokio::task::yield_now().await;
        self.read_sync(path, encoding)
    }

    async fn write(&self, path: &Path, contents: &str) -> Result<()> {
        tokio::task::yield_now().await;
        self.write_sync(path, contents)
    }

    async fn remove(&self, path: &Path) -> Result<()> {
        tokio::task::yield_now().await;
        self.remove_sync(path)
    }
}
