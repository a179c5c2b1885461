//! Realms and execution contexts

use crate::JobSink;
use evalgraph_modules::{ModuleRecord, Workspace};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// The environment a set of jobs runs against
///
/// Holds the execution-context stack; the running context is the top.
pub struct Realm {
    name: String,
    stack: Mutex<Vec<ExecutionContext>>,
}

impl Realm {
    /// Create a realm with an empty context stack
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stack: Mutex::new(Vec::new()),
        }
    }

    /// Realm name, for diagnostics
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Make `context` the running context
    pub fn push_context(&self, context: ExecutionContext) {
        self.stack.lock().push(context);
    }

    /// Remove and return the running context
    pub fn pop_context(&self) -> Option<ExecutionContext> {
        self.stack.lock().pop()
    }

    /// The running context
    pub fn running_context(&self) -> Option<ExecutionContext> {
        self.stack.lock().last().cloned()
    }

    /// Number of contexts on the stack
    pub fn depth(&self) -> usize {
        self.stack.lock().len()
    }
}

impl fmt::Debug for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Realm")
            .field("name", &self.name)
            .field("depth", &self.depth())
            .finish()
    }
}

/// State of one running job
#[derive(Clone)]
pub struct ExecutionContext {
    realm: Arc<Realm>,
    unit: ModuleRecord,
    jobs: JobSink,
    workspace: Workspace,
}

impl ExecutionContext {
    /// Context for running `unit` in `realm`
    pub fn new(realm: Arc<Realm>, unit: ModuleRecord, jobs: JobSink, workspace: Workspace) -> Self {
        Self {
            realm,
            unit,
            jobs,
            workspace,
        }
    }

    /// The realm the context belongs to
    pub fn realm(&self) -> &Arc<Realm> {
        &self.realm
    }

    /// The script or module being run
    pub fn unit(&self) -> &ModuleRecord {
        &self.unit
    }

    /// Handle for enqueueing further jobs
    pub fn jobs(&self) -> &JobSink {
        &self.jobs
    }

    /// The workspace the unit was resolved in
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("realm", &self.realm.name)
            .field("unit", &self.unit)
            .finish()
    }
}
