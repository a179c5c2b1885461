//! Evalgraph module system
//!
//! This crate provides the module graph resolver, including:
//! - Module records (scripts, ECMAScript modules, markup leaves, placeholders)
//! - The workspace and its per-path caches
//! - Import specifier resolution across package boundaries
//! - Compiler-option derivation and path mapping
//! - Loading of the caller-supplied root entries

pub mod cache;
pub mod entry;
pub mod error;
pub mod options;
pub mod record;
pub mod resolver;
pub mod workspace;

pub use cache::{CacheStats, OptionsKey, WorkspaceCache};
pub use entry::EntrySpec;
pub use error::{ModuleError, Result};
pub use options::CompilerOptions;
pub use record::{
    DeferredModule, EcmaModule, HostData, MarkupModule, ModuleRecord, RecordKind, ScriptRecord,
};
pub use workspace::Workspace;
