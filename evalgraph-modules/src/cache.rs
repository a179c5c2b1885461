//! Workspace caches
//!
//! Four independent maps. Records and files are keyed by canonical path,
//! compiler options by directory and package boundary. Entries are populated
//! lazily and never invalidated until the workspace is disposed.

use crate::{CompilerOptions, ModuleRecord, Result, ScriptRecord};
use evalgraph_fs::File;
use futures::future::{BoxFuture, Shared};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

pub(crate) type PendingOptions = Shared<BoxFuture<'static, Result<Arc<CompilerOptions>>>>;

/// Key of a compiler options lookup
///
/// The same directory can inherit different options depending on whether
/// the walk stops at a package directory, so the boundary is part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OptionsKey {
    /// Directory the options apply to
    pub directory: PathBuf,
    /// Package directory the upward walk stops at
    pub boundary: Option<PathBuf>,
}

impl OptionsKey {
    /// Key for `directory` walked up to `boundary`
    pub fn new(directory: impl Into<PathBuf>, boundary: Option<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            boundary,
        }
    }
}

/// Outcome of an options lookup
pub(crate) enum OptionsLookup {
    Cached(Arc<CompilerOptions>),
    Pending(PendingOptions),
}

/// Number of entries in each cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Module records (ECMAScript, markup and deferred)
    pub modules: usize,
    /// File handles created outside any package
    pub files: usize,
    /// Script records
    pub scripts: usize,
    /// Compiler options, per directory and boundary
    pub options: usize,
}

/// The caches one workspace owns
#[derive(Default)]
pub struct WorkspaceCache {
    modules: RwLock<FxHashMap<PathBuf, ModuleRecord>>,
    files: RwLock<FxHashMap<PathBuf, Arc<File>>>,
    scripts: RwLock<FxHashMap<PathBuf, Arc<ScriptRecord>>>,
    options: RwLock<FxHashMap<OptionsKey, Arc<CompilerOptions>>>,
    pending_options: Mutex<FxHashMap<OptionsKey, PendingOptions>>,
}

impl WorkspaceCache {
    /// Create empty caches
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached module record for `path`
    pub fn module(&self, path: &Path) -> Option<ModuleRecord> {
        let record = self.modules.read().get(path).cloned();
        if record.is_some() {
            trace!("Cache hit for module: {}", path.display());
        }
        record
    }

    /// Cached record for `path`, creating it with `create` on a miss
    pub fn module_or_insert_with(
        &self,
        path: &Path,
        create: impl FnOnce() -> ModuleRecord,
    ) -> ModuleRecord {
        if let Some(record) = self.module(path) {
            return record;
        }
        let mut modules = self.modules.write();
        modules
            .entry(path.to_path_buf())
            .or_insert_with(|| {
                let record = create();
                trace!("Created {}", record);
                record
            })
            .clone()
    }

    /// File handle for `path`, creating it with `create` on a miss
    pub fn file_or_insert_with(&self, path: &Path, create: impl FnOnce() -> File) -> Arc<File> {
        if let Some(file) = self.files.read().get(path) {
            return Arc::clone(file);
        }
        let mut files = self.files.write();
        Arc::clone(
            files
                .entry(path.to_path_buf())
                .or_insert_with(|| Arc::new(create())),
        )
    }

    /// Script record for `file`, created on a miss
    pub fn script_or_insert(&self, file: &Arc<File>) -> Arc<ScriptRecord> {
        if let Some(script) = self.scripts.read().get(&file.path) {
            return Arc::clone(script);
        }
        let mut scripts = self.scripts.write();
        Arc::clone(scripts.entry(file.path.clone()).or_insert_with(|| {
            trace!("Created script {}", file);
            Arc::new(ScriptRecord::new(Arc::clone(file)))
        }))
    }

    /// Options derived for `key`
    pub fn options(&self, key: &OptionsKey) -> Option<Arc<CompilerOptions>> {
        self.options.read().get(key).cloned()
    }

    pub(crate) fn insert_options(&self, key: OptionsKey, options: Arc<CompilerOptions>) {
        self.options.write().insert(key, options);
    }

    /// Cached options for `key`, else the derivation in flight, registering
    /// `start` when there is none
    ///
    /// The cache is checked again under the pending lock.
    pub(crate) fn options_or_pending(
        &self,
        key: &OptionsKey,
        start: impl FnOnce() -> PendingOptions,
    ) -> OptionsLookup {
        if let Some(options) = self.options(key) {
            trace!("Options cache hit for {}", key.directory.display());
            return OptionsLookup::Cached(options);
        }
        let mut pending = self.pending_options.lock();
        if let Some(options) = self.options(key) {
            return OptionsLookup::Cached(options);
        }
        OptionsLookup::Pending(pending.entry(key.clone()).or_insert_with(start).clone())
    }

    pub(crate) fn remove_pending_options(&self, key: &OptionsKey) {
        self.pending_options.lock().remove(key);
    }

    /// Number of derivations in flight
    pub fn pending_options(&self) -> usize {
        self.pending_options.lock().len()
    }

    /// Entry counts
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            modules: self.modules.read().len(),
            files: self.files.read().len(),
            scripts: self.scripts.read().len(),
            options: self.options.read().len(),
        }
    }

    /// Empty every cache, disposing each record
    ///
    /// Returns the number of records disposed.
    pub fn clear(&self) -> usize {
        let modules: Vec<_> = self.modules.write().drain().map(|(_, r)| r).collect();
        let scripts: Vec<_> = self.scripts.write().drain().map(|(_, s)| s).collect();
        self.files.write().clear();
        self.options.write().clear();
        self.pending_options.lock().clear();

        let disposed = modules.len() + scripts.len();
        for record in modules {
            record.dispose();
        }
        for script in scripts {
            ModuleRecord::Script(script).dispose();
        }
        debug!("Cleared workspace caches, disposed {} records", disposed);
        disposed
    }
}
