//! Module records
//!
//! A resolved import is one of four record kinds. Records are shared by
//! `Arc`, so two resolutions of the same file hand out the same instance and
//! identity can be checked with [`ModuleRecord::ptr_eq`].

use crate::CompilerOptions;
use evalgraph_fs::File;
use evalgraph_package::Package;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Opaque data an interpreter attaches to a record
pub type HostData = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
struct RecordSlot {
    host: Mutex<Option<HostData>>,
    disposed: AtomicBool,
}

impl RecordSlot {
    fn attach(&self, data: HostData) {
        *self.host.lock() = Some(data);
    }

    fn get(&self) -> Option<HostData> {
        self.host.lock().clone()
    }

    fn dispose(&self) {
        self.host.lock().take();
        self.disposed.store(true, Ordering::SeqCst);
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

/// Kind tag of a [`ModuleRecord`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Top-level script without imports or exports
    Script,
    /// ECMAScript module
    Ecma,
    /// Opaque markup leaf
    Markup,
    /// Placeholder whose kind is not known yet
    Deferred,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::Script => "script",
            RecordKind::Ecma => "module",
            RecordKind::Markup => "markup",
            RecordKind::Deferred => "deferred",
        };
        f.write_str(name)
    }
}

/// A top-level executable unit
pub struct ScriptRecord {
    file: Arc<File>,
    slot: RecordSlot,
}

impl ScriptRecord {
    /// Script for `file`
    pub fn new(file: Arc<File>) -> Self {
        Self {
            file,
            slot: RecordSlot::default(),
        }
    }

    /// The script file
    pub fn file(&self) -> &Arc<File> {
        &self.file
    }
}

/// A module with static import and export edges
pub struct EcmaModule {
    file: Arc<File>,
    package: Option<Arc<Package>>,
    options: RwLock<Option<Arc<CompilerOptions>>>,
    slot: RecordSlot,
}

impl EcmaModule {
    /// Module for `file`, owned by `package` unless standalone
    pub fn new(file: Arc<File>, package: Option<Arc<Package>>) -> Self {
        Self {
            file,
            package,
            options: RwLock::new(None),
            slot: RecordSlot::default(),
        }
    }

    /// The module file
    pub fn file(&self) -> &Arc<File> {
        &self.file
    }

    /// Owning package
    pub fn package(&self) -> Option<&Arc<Package>> {
        self.package.as_ref()
    }

    /// Whether the module belongs to no package
    pub fn is_standalone(&self) -> bool {
        self.package.is_none()
    }

    /// Compiler options attached so far
    pub fn compiler_options(&self) -> Option<Arc<CompilerOptions>> {
        self.options.read().clone()
    }

    /// Attach derived compiler options
    pub fn attach_compiler_options(&self, options: Arc<CompilerOptions>) {
        *self.options.write() = Some(options);
    }
}

/// A non-script file treated as an opaque leaf
pub struct MarkupModule {
    file: Arc<File>,
    package: Option<Arc<Package>>,
    slot: RecordSlot,
}

impl MarkupModule {
    /// Markup leaf for `file`
    pub fn new(file: Arc<File>, package: Option<Arc<Package>>) -> Self {
        Self {
            file,
            package,
            slot: RecordSlot::default(),
        }
    }

    /// The markup file
    pub fn file(&self) -> &Arc<File> {
        &self.file
    }

    /// Owning package
    pub fn package(&self) -> Option<&Arc<Package>> {
        self.package.as_ref()
    }
}

/// A file whose binding is not determined yet
///
/// Resolution hands out a placeholder instead of failing on files that are
/// neither script nor markup. The record it turns out to denote can be
/// attached later with [`DeferredModule::upgrade`].
pub struct DeferredModule {
    file: Arc<File>,
    package: Option<Arc<Package>>,
    target: RwLock<Option<ModuleRecord>>,
    slot: RecordSlot,
}

impl DeferredModule {
    /// Placeholder for `file`
    pub fn new(file: Arc<File>, package: Option<Arc<Package>>) -> Self {
        Self {
            file,
            package,
            target: RwLock::new(None),
            slot: RecordSlot::default(),
        }
    }

    /// The placeholder file
    pub fn file(&self) -> &Arc<File> {
        &self.file
    }

    /// Owning package
    pub fn package(&self) -> Option<&Arc<Package>> {
        self.package.as_ref()
    }

    /// Record this placeholder denotes
    pub fn upgrade(&self, record: ModuleRecord) {
        *self.target.write() = Some(record);
    }

    /// The upgraded record, if any
    pub fn resolved(&self) -> Option<ModuleRecord> {
        self.target.read().clone()
    }
}

/// One resolved unit of code
#[derive(Clone)]
pub enum ModuleRecord {
    /// Top-level script
    Script(Arc<ScriptRecord>),
    /// ECMAScript module
    Ecma(Arc<EcmaModule>),
    /// Markup leaf
    Markup(Arc<MarkupModule>),
    /// Undetermined placeholder
    Deferred(Arc<DeferredModule>),
}

impl ModuleRecord {
    /// Kind tag
    pub fn kind(&self) -> RecordKind {
        match self {
            ModuleRecord::Script(_) => RecordKind::Script,
            ModuleRecord::Ecma(_) => RecordKind::Ecma,
            ModuleRecord::Markup(_) => RecordKind::Markup,
            ModuleRecord::Deferred(_) => RecordKind::Deferred,
        }
    }

    /// The file the record was created for
    pub fn file(&self) -> &Arc<File> {
        match self {
            ModuleRecord::Script(r) => r.file(),
            ModuleRecord::Ecma(r) => r.file(),
            ModuleRecord::Markup(r) => r.file(),
            ModuleRecord::Deferred(r) => r.file(),
        }
    }

    /// Canonical path, the record's identity key
    pub fn path(&self) -> &Path {
        &self.file().path
    }

    /// Owning package; scripts never have one
    pub fn package(&self) -> Option<&Arc<Package>> {
        match self {
            ModuleRecord::Script(_) => None,
            ModuleRecord::Ecma(r) => r.package(),
            ModuleRecord::Markup(r) => r.package(),
            ModuleRecord::Deferred(r) => r.package(),
        }
    }

    /// Whether this is a script rather than a module
    pub fn is_script(&self) -> bool {
        matches!(self, ModuleRecord::Script(_))
    }

    /// The ECMAScript module, if this is one
    pub fn as_ecma(&self) -> Option<&Arc<EcmaModule>> {
        match self {
            ModuleRecord::Ecma(module) => Some(module),
            _ => None,
        }
    }

    /// The script, if this is one
    pub fn as_script(&self) -> Option<&Arc<ScriptRecord>> {
        match self {
            ModuleRecord::Script(script) => Some(script),
            _ => None,
        }
    }

    /// Whether both handles point at the same record
    pub fn ptr_eq(&self, other: &ModuleRecord) -> bool {
        match (self, other) {
            (ModuleRecord::Script(a), ModuleRecord::Script(b)) => Arc::ptr_eq(a, b),
            (ModuleRecord::Ecma(a), ModuleRecord::Ecma(b)) => Arc::ptr_eq(a, b),
            (ModuleRecord::Markup(a), ModuleRecord::Markup(b)) => Arc::ptr_eq(a, b),
            (ModuleRecord::Deferred(a), ModuleRecord::Deferred(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn slot(&self) -> &RecordSlot {
        match self {
            ModuleRecord::Script(r) => &r.slot,
            ModuleRecord::Ecma(r) => &r.slot,
            ModuleRecord::Markup(r) => &r.slot,
            ModuleRecord::Deferred(r) => &r.slot,
        }
    }

    /// Attach interpreter data, replacing any previous value
    pub fn attach_host_data(&self, data: HostData) {
        self.slot().attach(data);
    }

    /// Interpreter data attached so far
    pub fn host_data(&self) -> Option<HostData> {
        self.slot().get()
    }

    /// Release everything the record owns
    pub fn dispose(&self) {
        match self {
            ModuleRecord::Ecma(module) => {
                module.options.write().take();
            }
            ModuleRecord::Deferred(deferred) => {
                deferred.target.write().take();
            }
            ModuleRecord::Script(_) | ModuleRecord::Markup(_) => {}
        }
        self.slot().dispose();
    }

    /// Whether `dispose` has run
    pub fn is_disposed(&self) -> bool {
        self.slot().is_disposed()
    }
}

impl fmt::Debug for ModuleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRecord")
            .field("kind", &self.kind())
            .field("path", &self.path())
            .field("package", &self.package().map(|p| p.name()))
            .finish()
    }
}

impl fmt::Display for ModuleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str) -> Arc<File> {
        Arc::new(File::new(path, Path::new("/ws")))
    }

    #[test]
    fn test_identity_is_pointer_identity() {
        let module = Arc::new(EcmaModule::new(file("/ws/a.js"), None));
        let a = ModuleRecord::Ecma(Arc::clone(&module));
        let b = ModuleRecord::Ecma(module);
        let c = ModuleRecord::Ecma(Arc::new(EcmaModule::new(file("/ws/a.js"), None)));

        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
        assert_eq!(a.kind(), RecordKind::Ecma);
        assert_eq!(a.to_string(), "module a.js");
    }

    #[test]
    fn test_host_data_and_dispose() {
        let record = ModuleRecord::Script(Arc::new(ScriptRecord::new(file("/ws/run.js"))));
        record.attach_host_data(Arc::new(42_u32));
        let data = record.host_data().unwrap();
        assert_eq!(data.downcast_ref::<u32>(), Some(&42));

        record.dispose();
        assert!(record.is_disposed());
        assert!(record.host_data().is_none());
    }

    #[test]
    fn test_dispose_seen_from_other_threads() {
        let record = ModuleRecord::Script(Arc::new(ScriptRecord::new(file("/ws/run.js"))));
        assert!(!record.is_disposed());

        let shared = record.clone();
        std::thread::spawn(move || shared.dispose()).join().unwrap();
        assert!(record.is_disposed());
    }

    #[test]
    fn test_deferred_upgrade() {
        let deferred = Arc::new(DeferredModule::new(file("/ws/data.bin"), None));
        let record = ModuleRecord::Deferred(Arc::clone(&deferred));
        assert!(deferred.resolved().is_none());

        let target = ModuleRecord::Markup(Arc::new(MarkupModule::new(file("/ws/view.html"), None)));
        deferred.upgrade(target.clone());
        assert!(deferred.resolved().unwrap().ptr_eq(&target));

        record.dispose();
        assert!(deferred.resolved().is_none());
    }
}
