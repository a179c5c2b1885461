//! Structural instantiation of a module graph

use crate::{Completion, EvalError, Evaluator};
use evalgraph_modules::{ModuleRecord, Workspace};
use rustc_hash::FxHashSet;
use std::path::PathBuf;
use tracing::{debug, trace};

/// Resolve and link the whole dependency subgraph of `root`
///
/// Depth-first over ECMAScript modules; each module is linked once, so
/// cycles terminate. Markup and deferred records are leaves. The first
/// failure to resolve a specifier becomes an abrupt completion of the
/// importing module. Returns the number of modules linked.
pub async fn instantiate(
    workspace: &Workspace,
    evaluator: &dyn Evaluator,
    root: &ModuleRecord,
) -> Completion<usize> {
    let mut visited: FxHashSet<PathBuf> = FxHashSet::default();
    let mut stack = vec![root.clone()];
    let mut linked = 0;

    while let Some(record) = stack.pop() {
        if !visited.insert(record.path().to_path_buf()) {
            continue;
        }
        if record.as_ecma().is_none() {
            trace!("Leaf {}", record);
            continue;
        }

        let specifiers = match evaluator.requested_modules(workspace, &record).await {
            Completion::Normal(specifiers) => specifiers,
            Completion::Abrupt(abrupt) => return Completion::Abrupt(abrupt),
        };

        let mut dependencies = Vec::with_capacity(specifiers.len());
        for specifier in &specifiers {
            match workspace.resolve_import(specifier, &record).await {
                Ok(dependency) => dependencies.push(dependency),
                Err(error) => {
                    return Completion::abrupt(EvalError::resolution(specifier, &error), record)
                }
            }
        }

        if let Completion::Abrupt(abrupt) = evaluator.link(&record, &dependencies).await {
            return Completion::Abrupt(abrupt);
        }
        linked += 1;

        stack.extend(
            dependencies
                .into_iter()
                .rev()
                .filter(|dependency| !visited.contains(dependency.path())),
        );
    }

    debug!("Instantiated {} ({} modules linked)", root, linked);
    Completion::Normal(linked)
}
