//! Module system error types

use evalgraph_fs::FsError;
use evalgraph_package::PackageError;
use std::path::PathBuf;
use thiserror::Error;

/// Type alias for module system results
pub type Result<T> = std::result::Result<T, ModuleError>;

/// Errors that can occur while resolving modules
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModuleError {
    /// No file answers the specifier
    #[error("Module not found: '{specifier}' imported from {referrer}")]
    ModuleNotFound {
        /// The import specifier
        specifier: String,
        /// Path of the importing file
        referrer: PathBuf,
    },

    /// A standalone file imported something by name
    #[error("Cannot import '{specifier}' from standalone file {referrer}: only relative imports are supported")]
    BareSpecifierInStandalone {
        /// The import specifier
        specifier: String,
        /// Path of the importing file
        referrer: PathBuf,
    },

    /// A bare specifier is neither a dependency nor covered by path mapping
    #[error("'{specifier}' imported from {referrer} is not a declared dependency and no path mapping is configured")]
    NoPathMapping {
        /// The import specifier
        specifier: String,
        /// Path of the importing file
        referrer: PathBuf,
    },

    /// A compiler-options document could not be parsed
    #[error("Invalid compiler options at {path}: {message}")]
    InvalidOptions {
        /// Document path
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// The workspace was used after `dispose`
    #[error("Workspace has been disposed")]
    Disposed,

    /// Package loading failed
    #[error(transparent)]
    Package(#[from] PackageError),

    /// File system failure
    #[error(transparent)]
    Fs(#[from] FsError),
}
