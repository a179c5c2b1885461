//! Package loading and caching

use crate::{Package, PackageDependency, PackageError, PackageSource, ResolverConfig, Result};
use evalgraph_fs::path::{normalize, vendor_root};
use evalgraph_fs::{Encoding, File, FileSystem, FsError};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, trace};

type PendingLoad = Shared<BoxFuture<'static, Result<Arc<Package>>>>;

/// Resolves dependency references and paths into cached packages
///
/// Cloning is cheap; clones share the same caches.
#[derive(Clone)]
pub struct PackageLoader {
    inner: Arc<LoaderInner>,
}

struct LoaderInner {
    fs: Arc<dyn FileSystem>,
    config: ResolverConfig,
    root: PathBuf,
    /// Completed loads by referenced name
    packages: RwLock<FxHashMap<String, Arc<Package>>>,
    /// Canonical directory per referenced name
    directories: RwLock<FxHashMap<String, PathBuf>>,
    /// One package per canonical directory
    by_directory: RwLock<FxHashMap<PathBuf, Arc<Package>>>,
    /// Loads in flight; removed once `packages` holds the result
    pending: Mutex<FxHashMap<String, PendingLoad>>,
}

impl PackageLoader {
    /// Create a loader over `fs`, relativizing file paths against `root`
    pub fn new(fs: Arc<dyn FileSystem>, config: ResolverConfig, root: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                fs,
                config,
                root: normalize(&root.into()),
                packages: RwLock::new(FxHashMap::default()),
                directories: RwLock::new(FxHashMap::default()),
                by_directory: RwLock::new(FxHashMap::default()),
                pending: Mutex::new(FxHashMap::default()),
            }),
        }
    }

    /// The file system packages are read from
    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.inner.fs
    }

    /// Naming conventions in effect
    pub fn config(&self) -> &ResolverConfig {
        &self.inner.config
    }

    /// Workspace root
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Load the package owning `path`
    ///
    /// A file path becomes the package's explicit entry file. The walk for a
    /// manifest starts at the file's directory and moves upward.
    pub async fn load_entry_package(&self, path: &Path) -> Result<Arc<Package>> {
        let path = normalize(&self.inner.root.join(path));
        let meta = self
            .inner
            .fs
            .stat(&path)
            .await?
            .ok_or_else(|| FsError::NotFound { path: path.clone() })?;

        let canonical = self.inner.fs.resolve_symlink(&path).await?;
        let (start, entry_file) = if meta.is_file() {
            let dir = canonical.parent().map(Path::to_path_buf).unwrap_or_default();
            (dir, Some(canonical))
        } else {
            (canonical, None)
        };

        let manifest = &self.inner.config.manifest_name;
        for dir in start.ancestors() {
            if self.inner.fs.is_file(&dir.join(manifest)).await {
                debug!("Found {} for {} in {}", manifest, path.display(), dir.display());
                return self.load_directory(dir, None, entry_file).await;
            }
        }

        Err(PackageError::NoManifestFound {
            start,
            manifest: manifest.clone(),
        })
    }

    /// Load the package a dependency edge refers to
    ///
    /// Concurrent calls for the same name share one in-flight load.
    pub async fn load_package(&self, dependency: &PackageDependency) -> Result<Arc<Package>> {
        let name = dependency.name();
        let cached = self.inner.packages.read().get(name).cloned();
        if let Some(package) = cached {
            trace!("Package cache hit for {}", name);
            return Ok(package);
        }

        let load = {
            let mut pending = self.inner.pending.lock();
            if let Some(package) = self.inner.packages.read().get(name) {
                return Ok(Arc::clone(package));
            }
            match pending.get(name) {
                Some(load) => {
                    trace!("Joining in-flight load of {}", name);
                    load.clone()
                }
                None => {
                    let loader = self.clone();
                    let dependency = dependency.clone();
                    let load = async move { loader.construct(dependency).await }
                        .boxed()
                        .shared();
                    pending.insert(name.to_string(), load.clone());
                    load
                }
            }
        };

        load.await
    }

    async fn construct(self, dependency: PackageDependency) -> Result<Arc<Package>> {
        let name = dependency.name().to_string();
        let result = self.resolve_and_load(dependency).await;
        if let Ok(package) = &result {
            self.inner
                .packages
                .write()
                .insert(name.clone(), Arc::clone(package));
        }
        self.inner.pending.lock().remove(&name);
        result
    }

    async fn resolve_and_load(&self, dependency: PackageDependency) -> Result<Arc<Package>> {
        let directory = self.resolve_directory(&dependency).await?;
        self.inner
            .directories
            .write()
            .insert(dependency.name().to_string(), directory.clone());
        self.load_directory(&directory, Some(dependency), None).await
    }

    /// Canonical directory of the package a dependency edge refers to
    pub async fn resolve_directory(&self, dependency: &PackageDependency) -> Result<PathBuf> {
        let name = dependency.name();
        let cached = self.inner.directories.read().get(name).cloned();
        if let Some(directory) = cached {
            return Ok(directory);
        }

        let config = &self.inner.config;
        let issuer_dir = dependency.issuer().directory();
        let manifest_at = |dir: &Path| {
            dir.join(&config.vendor_dir)
                .join(name)
                .join(&config.manifest_name)
        };

        let mut found = None;
        if let Some(top) = vendor_root(issuer_dir, &config.vendor_dir) {
            let candidate = manifest_at(&top);
            if self.inner.fs.is_file(&candidate).await {
                trace!("Resolved {} through the top-level vendor directory", name);
                found = Some(candidate);
            }
        }
        if found.is_none() {
            for dir in issuer_dir.ancestors() {
                let candidate = manifest_at(dir);
                if self.inner.fs.is_file(&candidate).await {
                    found = Some(candidate);
                    break;
                }
            }
        }

        let manifest = found.ok_or_else(|| PackageError::DependencyNotFound {
            name: name.to_string(),
            issuer: issuer_dir.to_path_buf(),
        })?;
        let canonical = self.inner.fs.resolve_symlink(&manifest).await?;
        if canonical == manifest {
            debug!("Resolved {} directly at {}", name, manifest.display());
        } else {
            debug!(
                "Resolved {} through symlink {} -> {}",
                name,
                manifest.display(),
                canonical.display()
            );
        }

        Ok(canonical
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default())
    }

    async fn load_directory(
        &self,
        directory: &Path,
        issuer: Option<PackageDependency>,
        entry_file: Option<PathBuf>,
    ) -> Result<Arc<Package>> {
        let cached = self.inner.by_directory.read().get(directory).cloned();
        if let Some(package) = cached {
            trace!("Package cache hit for {}", directory.display());
            return Ok(package);
        }

        let config = &self.inner.config;
        let manifest_path = directory.join(&config.manifest_name);
        let manifest_text = self
            .inner
            .fs
            .read(&manifest_path, Encoding::Utf8)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    PackageError::ManifestMissing {
                        path: manifest_path.clone(),
                    }
                } else {
                    e.into()
                }
            })?;

        let files = self
            .inner
            .fs
            .read_directory(directory, &config.traversal_filter())
            .await?
            .into_iter()
            .map(|path| Arc::new(File::new(path, &self.inner.root)))
            .collect();

        let package = Arc::new(Package::build(
            PackageSource {
                root: self.inner.root.clone(),
                directory: directory.to_path_buf(),
                files,
                issuer,
                manifest_path,
                manifest_text,
                entry_file,
            },
            config,
        )?);
        info!(
            "Loaded package {} from {}",
            package.name(),
            directory.display()
        );

        let mut by_directory = self.inner.by_directory.write();
        let package = by_directory
            .entry(directory.to_path_buf())
            .or_insert(package);
        Ok(Arc::clone(package))
    }

    /// Whether `load_package` has completed for `name`
    pub fn has_cached_package(&self, name: &str) -> bool {
        self.inner.packages.read().contains_key(name)
    }

    /// The package a completed `load_package` produced for `name`
    pub fn get_cached_package(&self, name: &str) -> Result<Arc<Package>> {
        self.inner
            .packages
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| PackageError::NotLoaded {
                name: name.to_string(),
            })
    }

    /// Canonical directory resolved for `name`, if any
    pub fn cached_directory(&self, name: &str) -> Option<PathBuf> {
        self.inner.directories.read().get(name).cloned()
    }

    /// Every distinct package loaded so far, sorted by directory
    pub fn packages(&self) -> Vec<Arc<Package>> {
        let mut packages: Vec<_> = self.inner.by_directory.read().values().cloned().collect();
        packages.sort_by(|a, b| a.directory().cmp(b.directory()));
        packages
    }

    /// Number of loads currently in flight
    pub fn pending_loads(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Drop every cached package and directory
    pub fn clear(&self) {
        self.inner.packages.write().clear();
        self.inner.directories.write().clear();
        self.inner.by_directory.write().clear();
        self.inner.pending.lock().clear();
    }
}

impl std::fmt::Debug for PackageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageLoader")
            .field("root", &self.inner.root)
            .field("packages", &self.inner.packages.read().len())
            .field("pending", &self.inner.pending.lock().len())
            .finish()
    }
}
