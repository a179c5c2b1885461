//! Runtime error types

use evalgraph_modules::ModuleError;
use std::path::PathBuf;
use thiserror::Error;

/// Type alias for runtime results
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Structural errors that stop a run before or outside job execution
///
/// Failures while a job runs are abrupt completions, not errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// The run configuration is inconsistent
    #[error("Invalid run configuration: {message}")]
    InvalidConfig {
        /// What is wrong
        message: String,
    },

    /// The run configuration file could not be read or parsed
    #[error("Cannot load run configuration {path}: {message}")]
    ConfigLoad {
        /// Configuration file
        path: PathBuf,
        /// Reader or parser message
        message: String,
    },

    /// Entry loading or resolution failed
    #[error(transparent)]
    Module(#[from] ModuleError),
}
