//! Evalgraph package layer
//!
//! This crate turns directories into packages and dependency references into
//! loaded packages:
//! - Package manifest (package.json) handling
//! - Resolver configuration shared with the module workspace
//! - Package record construction with entry-file selection
//! - Package loading with vendor-directory search, symlink canonicalization
//!   and de-duplication of concurrent loads

pub mod config;
pub mod error;
pub mod loader;
pub mod manifest;
pub mod package;

pub use config::ResolverConfig;
pub use error::{PackageError, Result};
pub use loader::PackageLoader;
pub use manifest::Manifest;
pub use package::{Package, PackageDependency, PackageSource};
