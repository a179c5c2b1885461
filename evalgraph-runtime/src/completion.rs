//! Completion values
//!
//! Instantiation and evaluation report failure as an abrupt completion that
//! the caller inspects, never as a Rust error.

use evalgraph_modules::{ModuleError, ModuleRecord};
use std::fmt;

/// The value an abrupt completion carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalError {
    /// Human-readable description
    pub message: String,
    /// Import specifier involved, if the failure was a resolution
    pub specifier: Option<String>,
}

impl EvalError {
    /// Error with a message only
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            specifier: None,
        }
    }

    /// A specifier that failed to resolve
    pub fn resolution(specifier: impl Into<String>, error: &ModuleError) -> Self {
        Self {
            message: error.to_string(),
            specifier: Some(specifier.into()),
        }
    }
}

impl From<ModuleError> for EvalError {
    fn from(error: ModuleError) -> Self {
        Self::new(error.to_string())
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.specifier {
            Some(specifier) => write!(f, "{} (while resolving '{}')", self.message, specifier),
            None => f.write_str(&self.message),
        }
    }
}

/// A failed step, with the unit being processed when it failed
#[derive(Debug, Clone)]
pub struct Abrupt {
    error: EvalError,
    unit: ModuleRecord,
}

impl Abrupt {
    /// Abrupt completion of `unit`
    pub fn new(error: EvalError, unit: ModuleRecord) -> Self {
        Self { error, unit }
    }

    /// The error value
    pub fn error(&self) -> &EvalError {
        &self.error
    }

    /// The script or module that was being processed
    pub fn unit(&self) -> &ModuleRecord {
        &self.unit
    }
}

impl fmt::Display for Abrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.unit, self.error)
    }
}

/// Normal or abrupt outcome of a step
#[derive(Debug, Clone)]
pub enum Completion<T = ()> {
    /// The step finished
    Normal(T),
    /// The step failed
    Abrupt(Abrupt),
}

impl Completion<()> {
    /// The inert completion of a skipped step
    pub fn empty() -> Self {
        Completion::Normal(())
    }
}

impl<T> Completion<T> {
    /// Abrupt completion of `unit` with `error`
    pub fn abrupt(error: EvalError, unit: ModuleRecord) -> Self {
        Completion::Abrupt(Abrupt::new(error, unit))
    }

    /// Whether the step finished
    pub fn is_normal(&self) -> bool {
        matches!(self, Completion::Normal(_))
    }

    /// Whether the step failed
    pub fn is_abrupt(&self) -> bool {
        matches!(self, Completion::Abrupt(_))
    }

    /// The normal value
    pub fn value(&self) -> Option<&T> {
        match self {
            Completion::Normal(value) => Some(value),
            Completion::Abrupt(_) => None,
        }
    }

    /// The abrupt record
    pub fn as_abrupt(&self) -> Option<&Abrupt> {
        match self {
            Completion::Normal(_) => None,
            Completion::Abrupt(abrupt) => Some(abrupt),
        }
    }

    /// Transform the normal value
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Completion<U> {
        match self {
            Completion::Normal(value) => Completion::Normal(f(value)),
            Completion::Abrupt(abrupt) => Completion::Abrupt(abrupt),
        }
    }
}
