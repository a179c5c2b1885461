//! The workspace: module caches, entry loading and compiler options

use crate::cache::{CacheStats, OptionsKey, OptionsLookup, WorkspaceCache};
use crate::{
    CompilerOptions, DeferredModule, EcmaModule, EntrySpec, MarkupModule, ModuleError,
    ModuleRecord, Result,
};
use evalgraph_fs::path::normalize;
use evalgraph_fs::{Encoding, File, FileSystem, FsError};
use evalgraph_package::{Package, PackageLoader, ResolverConfig};
use futures::future::{BoxFuture, FutureExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Owns every cache of one run and resolves imports against them
///
/// Cloning is cheap; clones share the same caches.
#[derive(Clone)]
pub struct Workspace {
    inner: Arc<WorkspaceInner>,
}

struct WorkspaceInner {
    loader: PackageLoader,
    cache: WorkspaceCache,
    disposed: AtomicBool,
}

impl Workspace {
    /// Create a workspace over `fs` rooted at `root`
    pub fn new(fs: Arc<dyn FileSystem>, config: ResolverConfig, root: impl Into<PathBuf>) -> Self {
        Self::with_loader(PackageLoader::new(fs, config, root))
    }

    /// Create a workspace around an existing package loader
    pub fn with_loader(loader: PackageLoader) -> Self {
        Self {
            inner: Arc::new(WorkspaceInner {
                loader,
                cache: WorkspaceCache::new(),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// The package loader
    pub fn loader(&self) -> &PackageLoader {
        &self.inner.loader
    }

    /// The module, file, script and options caches
    pub fn cache(&self) -> &WorkspaceCache {
        &self.inner.cache
    }

    /// The file system
    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        self.inner.loader.fs()
    }

    /// Naming conventions in effect
    pub fn config(&self) -> &ResolverConfig {
        self.inner.loader.config()
    }

    /// Workspace root
    pub fn root(&self) -> &Path {
        self.inner.loader.root()
    }

    /// Cache entry counts
    pub fn stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    /// Cached module record for a canonical path
    pub fn module(&self, path: &Path) -> Option<ModuleRecord> {
        self.inner.cache.module(path)
    }

    pub(crate) fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            Err(ModuleError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Load one record per entry, in input order
    pub async fn load_entry_files(&self, entries: &[EntrySpec]) -> Result<Vec<ModuleRecord>> {
        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            records.push(self.load_entry(entry).await?);
        }
        debug!("Loaded {} entries", records.len());
        Ok(records)
    }

    /// Load the record a single entry denotes
    pub async fn load_entry(&self, entry: &EntrySpec) -> Result<ModuleRecord> {
        self.ensure_live()?;
        let path = normalize(&self.root().join(entry.path()));

        match entry {
            EntrySpec::Script { .. } => {
                let file = self.entry_file(&path).await?;
                Ok(ModuleRecord::Script(self.inner.cache.script_or_insert(&file)))
            }
            EntrySpec::Module {
                standalone: true, ..
            } => {
                let file = self.entry_file(&path).await?;
                Ok(self.module_for_file(&file, None))
            }
            EntrySpec::Module { .. } => {
                let canonical = self.fs().resolve_symlink(&path).await?;
                let package = self.inner.loader.load_entry_package(&path).await?;
                let file = package
                    .file(&canonical)
                    .unwrap_or_else(|| self.cached_file(&canonical));
                Ok(self.module_for_file(&file, Some(&package)))
            }
            EntrySpec::Package { .. } => {
                let package = self.inner.loader.load_entry_package(&path).await?;
                Ok(self.module_for_file(package.entry_file(), Some(&package)))
            }
        }
    }

    async fn entry_file(&self, path: &Path) -> Result<Arc<File>> {
        match self.fs().stat(path).await? {
            Some(meta) if meta.is_file() => {}
            Some(_) => {
                return Err(FsError::WrongKind {
                    path: path.to_path_buf(),
                    expected: "file",
                }
                .into())
            }
            None => {
                return Err(FsError::NotFound {
                    path: path.to_path_buf(),
                }
                .into())
            }
        }
        let canonical = self.fs().resolve_symlink(path).await?;
        Ok(self.cached_file(&canonical))
    }

    /// File handle for a canonical path outside any package
    pub(crate) fn cached_file(&self, canonical: &Path) -> Arc<File> {
        let root = self.root().to_path_buf();
        self.inner
            .cache
            .file_or_insert_with(canonical, || File::new(canonical.to_path_buf(), &root))
    }

    /// The record for `file`, created on first request
    ///
    /// Scripts become ECMAScript modules, markup becomes a markup leaf and
    /// anything else gets a deferred placeholder.
    pub(crate) fn module_for_file(
        &self,
        file: &Arc<File>,
        package: Option<&Arc<Package>>,
    ) -> ModuleRecord {
        self.inner.cache.module_or_insert_with(&file.path, || {
            let file = Arc::clone(file);
            let package = package.cloned();
            if file.is_script() {
                ModuleRecord::Ecma(Arc::new(EcmaModule::new(file, package)))
            } else if file.is_markup() {
                ModuleRecord::Markup(Arc::new(MarkupModule::new(file, package)))
            } else {
                debug!("Deferring {} ({})", file, file.kind);
                ModuleRecord::Deferred(Arc::new(DeferredModule::new(file, package)))
            }
        })
    }

    /// First existing file among `target`, `target.<ext>` and `target/index.<ext>`
    pub(crate) async fn locate(&self, target: &Path) -> Option<PathBuf> {
        let fs = self.fs();
        if fs.is_file(target).await {
            return Some(target.to_path_buf());
        }
        let extensions = &self.config().script_extensions;
        for ext in extensions {
            let mut candidate = target.as_os_str().to_os_string();
            candidate.push(".");
            candidate.push(ext);
            let candidate = PathBuf::from(candidate);
            if fs.is_file(&candidate).await {
                return Some(candidate);
            }
        }
        for ext in extensions {
            let candidate = target.join(format!("index.{}", ext));
            if fs.is_file(&candidate).await {
                return Some(candidate);
            }
        }
        None
    }

    /// Source text of a record's file
    pub async fn read_source(&self, record: &ModuleRecord) -> Result<String> {
        Ok(self.fs().read(record.path(), Encoding::Utf8).await?)
    }

    /// Compiler options in effect for files in `directory`
    ///
    /// Walks upward until an options document is found or `boundary` (the
    /// owning package's directory) is reached. Every directory visited is
    /// cached with the inherited result, keyed together with `boundary`.
    pub fn compiler_options_for(
        &self,
        directory: PathBuf,
        boundary: Option<PathBuf>,
    ) -> BoxFuture<'static, Result<Arc<CompilerOptions>>> {
        let workspace = self.clone();
        let key = OptionsKey::new(directory, boundary);
        async move {
            let lookup = workspace.inner.cache.options_or_pending(&key, || {
                let derive = workspace.clone();
                let key = key.clone();
                async move { derive.derive_options(key).await }
                    .boxed()
                    .shared()
            });
            match lookup {
                OptionsLookup::Cached(options) => Ok(options),
                OptionsLookup::Pending(pending) => pending.await,
            }
        }
        .boxed()
    }

    async fn derive_options(self, key: OptionsKey) -> Result<Arc<CompilerOptions>> {
        let result = self.read_options(&key.directory, key.boundary.clone()).await;
        if let Ok(options) = &result {
            self.inner
                .cache
                .insert_options(key.clone(), Arc::clone(options));
        }
        self.inner.cache.remove_pending_options(&key);
        result
    }

    async fn read_options(
        &self,
        directory: &Path,
        boundary: Option<PathBuf>,
    ) -> Result<Arc<CompilerOptions>> {
        let document = directory.join(&self.config().options_name);
        if self.fs().is_file(&document).await {
            let text = self.fs().read(&document, Encoding::Utf8).await?;
            let options = CompilerOptions::parse(&text, &document)?;
            debug!("Found compiler options at {}", document.display());
            return Ok(Arc::new(options));
        }

        let at_boundary = boundary.as_deref() == Some(directory);
        match directory.parent() {
            Some(parent) if !at_boundary => {
                self.compiler_options_for(parent.to_path_buf(), boundary)
                    .await
            }
            _ => Ok(Arc::new(CompilerOptions::default())),
        }
    }

    /// Compiler options of a module, derived and attached on first request
    pub async fn module_compiler_options(
        &self,
        module: &Arc<EcmaModule>,
    ) -> Result<Arc<CompilerOptions>> {
        if let Some(options) = module.compiler_options() {
            return Ok(options);
        }
        let boundary = module.package().map(|p| p.directory().to_path_buf());
        let options = self
            .compiler_options_for(module.file().directory.clone(), boundary)
            .await?;
        module.attach_compiler_options(Arc::clone(&options));
        Ok(options)
    }

    /// Whether `dispose` has run
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Release every cache and dispose every cached record
    ///
    /// Later calls do nothing.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        let records = self.inner.cache.clear();
        self.inner.loader.clear();
        debug!("Disposed workspace, released {} records", records);
    }
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("root", &self.root())
            .field("stats", &self.stats())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
