//! Package layer error types

use evalgraph_fs::FsError;
use std::path::PathBuf;
use thiserror::Error;

/// Type alias for package results
pub type Result<T> = std::result::Result<T, PackageError>;

/// Errors that can occur while building or loading packages
///
/// All of these describe a structurally broken input and are never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PackageError {
    /// Walking up from an entry path reached the root without a manifest
    #[error("No {manifest} found in {start} or any parent directory")]
    NoManifestFound {
        /// Where the walk started
        start: PathBuf,
        /// Manifest file name searched for
        manifest: String,
    },

    /// No vendor directory on the issuer's ancestor chain holds the dependency
    #[error("Cannot resolve dependency '{name}' from {issuer}")]
    DependencyNotFound {
        /// Referenced package name
        name: String,
        /// Directory of the issuing package
        issuer: PathBuf,
    },

    /// The manifest expected at a package path could not be read
    #[error("Manifest missing at {path}")]
    ManifestMissing {
        /// Expected manifest path
        path: PathBuf,
    },

    /// Manifest exists but is not a valid document
    #[error("Invalid manifest at {path}: {message}")]
    InvalidManifest {
        /// Manifest path
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// Neither the manifest nor the naming conventions select an entry file
    #[error("Cannot determine entry file for package '{package}' in {directory}")]
    NoEntryFile {
        /// Package name
        package: String,
        /// Package directory
        directory: PathBuf,
    },

    /// `get_cached_package` was called before the load completed
    #[error("Package '{name}' has not been loaded")]
    NotLoaded {
        /// Referenced package name
        name: String,
    },

    /// File system failure
    #[error(transparent)]
    Fs(#[from] FsError),
}
