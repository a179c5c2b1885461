//! File system error types

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for file system results
pub type Result<T> = std::result::Result<T, FsError>;

/// Errors raised by a `FileSystem` adapter
///
/// Errors are `Clone` because a single failed read can be observed by several
/// waiters sharing the same in-flight load.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FsError {
    /// Nothing exists at the path
    #[error("No such file or directory: {path}")]
    NotFound {
        /// The missing path
        path: PathBuf,
    },

    /// The path exists but is not the expected kind of entry
    #[error("Not a {expected}: {path}")]
    WrongKind {
        /// The offending path
        path: PathBuf,
        /// What the caller needed ("file" or "directory")
        expected: &'static str,
    },

    /// Symlink resolution did not terminate
    #[error("Too many levels of symbolic links: {path}")]
    SymlinkLoop {
        /// Path whose resolution looped
        path: PathBuf,
    },

    /// Content could not be decoded with the requested encoding
    #[error("Invalid {encoding} content in {path}")]
    InvalidEncoding {
        /// File being decoded
        path: PathBuf,
        /// Encoding that was requested
        encoding: &'static str,
    },

    /// Underlying I/O failure
    #[error("IO error on {path}: {message}")]
    Io {
        /// Path of the failed operation
        path: PathBuf,
        /// Rendered `std::io::Error`
        message: String,
    },
}

impl FsError {
    /// Wrap an I/O error, mapping `NotFound` onto the dedicated variant
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        let path = path.into();
        if error.kind() == std::io::ErrorKind::NotFound {
            FsError::NotFound { path }
        } else {
            FsError::Io {
                path,
                message: error.to_string(),
            }
        }
    }

    /// Whether the error only says that the path is absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound { .. })
    }
}
