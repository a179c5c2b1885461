//! The interpreter seam

use crate::{Completion, EvalError, ExecutionContext};
use async_trait::async_trait;
use evalgraph_modules::{ModuleRecord, Workspace};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

/// What the scheduler needs from an interpreter
///
/// Every step reports failure as an abrupt completion.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Import specifiers a module requests, in source order
    async fn requested_modules(
        &self,
        workspace: &Workspace,
        module: &ModuleRecord,
    ) -> Completion<Vec<String>>;

    /// Bind a module to its resolved dependencies
    async fn link(&self, _module: &ModuleRecord, _dependencies: &[ModuleRecord]) -> Completion {
        Completion::empty()
    }

    /// Run a module body
    async fn evaluate_module(&self, context: &ExecutionContext, module: &ModuleRecord)
        -> Completion;

    /// Run a script
    async fn evaluate_script(&self, context: &ExecutionContext, script: &ModuleRecord)
        -> Completion;
}

static STATIC_IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*(?:import|export)\s+(?:[^'";]*?\s+from\s+)?["']([^"'\n]+)["']"#).unwrap()
});

/// Import and re-export specifiers written in `source`, in order
pub fn scan_static_imports(source: &str) -> Vec<String> {
    STATIC_IMPORT_RE
        .captures_iter(source)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Evaluator that only discovers the static module graph
///
/// Reads each module through the workspace and scans its `import` and
/// `export ... from` declarations. Evaluation always completes normally.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticImportEvaluator;

impl StaticImportEvaluator {
    /// Create the evaluator
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Evaluator for StaticImportEvaluator {
    async fn requested_modules(
        &self,
        workspace: &Workspace,
        module: &ModuleRecord,
    ) -> Completion<Vec<String>> {
        match workspace.read_source(module).await {
            Ok(source) => {
                let specifiers = scan_static_imports(&source);
                trace!("{} requests {:?}", module, specifiers);
                Completion::Normal(specifiers)
            }
            Err(error) => Completion::abrupt(EvalError::from(error), module.clone()),
        }
    }

    async fn evaluate_module(
        &self,
        _context: &ExecutionContext,
        module: &ModuleRecord,
    ) -> Completion {
        trace!("Evaluated {}", module);
        Completion::empty()
    }

    async fn evaluate_script(
        &self,
        _context: &ExecutionContext,
        script: &ModuleRecord,
    ) -> Completion {
        trace!("Evaluated {}", script);
        Completion::empty()
    }
}
