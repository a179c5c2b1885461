//! Jobs and job queues

use crate::link::instantiate;
use crate::{Completion, Evaluator, ExecutionContext, Realm, RunOptions};
use evalgraph_modules::{ModuleRecord, Workspace};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// The two queues of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueKind {
    /// Seeded with the root entries; always drained first
    Script,
    /// Continuations enqueued while jobs run
    Promise,
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueKind::Script => f.write_str("ScriptJobs"),
            QueueKind::Promise => f.write_str("PromiseJobs"),
        }
    }
}

/// One unit of scheduled work
#[derive(Clone)]
pub enum Job {
    /// Instantiate and evaluate a module
    TopLevelModuleEvaluation {
        /// Realm the job runs in
        realm: Arc<Realm>,
        /// Module to run
        module: ModuleRecord,
    },
    /// Evaluate a script
    ScriptEvaluation {
        /// Realm the job runs in
        realm: Arc<Realm>,
        /// Script to run
        script: ModuleRecord,
    },
}

impl Job {
    /// The job kind matching `unit`
    pub fn for_unit(realm: Arc<Realm>, unit: ModuleRecord) -> Self {
        if unit.is_script() {
            Job::ScriptEvaluation {
                realm,
                script: unit,
            }
        } else {
            Job::TopLevelModuleEvaluation {
                realm,
                module: unit,
            }
        }
    }

    /// The realm the job is bound to
    pub fn realm(&self) -> &Arc<Realm> {
        match self {
            Job::TopLevelModuleEvaluation { realm, .. } | Job::ScriptEvaluation { realm, .. } => {
                realm
            }
        }
    }

    /// The script or module the job runs
    pub fn unit(&self) -> &ModuleRecord {
        match self {
            Job::TopLevelModuleEvaluation { module, .. } => module,
            Job::ScriptEvaluation { script, .. } => script,
        }
    }

    /// Run the job to completion in a fresh execution context
    pub async fn run(
        &self,
        workspace: &Workspace,
        evaluator: &dyn Evaluator,
        options: &RunOptions,
        jobs: JobSink,
    ) -> Completion {
        let context = ExecutionContext::new(
            Arc::clone(self.realm()),
            self.unit().clone(),
            jobs,
            workspace.clone(),
        );
        self.realm().push_context(context.clone());

        let completion = match self {
            Job::TopLevelModuleEvaluation { module, .. } => {
                run_module(&context, evaluator, options, module).await
            }
            Job::ScriptEvaluation { script, .. } => {
                run_script(&context, evaluator, options, script).await
            }
        };

        self.realm().pop_context();
        completion
    }
}

async fn run_module(
    context: &ExecutionContext,
    evaluator: &dyn Evaluator,
    options: &RunOptions,
    module: &ModuleRecord,
) -> Completion {
    if options.instantiate {
        if let Completion::Abrupt(abrupt) = instantiate(context.workspace(), evaluator, module).await {
            return Completion::Abrupt(abrupt);
        }
    } else {
        debug!("Instantiation skipped for {}", module);
    }

    if options.instantiate && options.evaluate {
        evaluator.evaluate_module(context, module).await
    } else {
        debug!("Evaluation skipped for {}", module);
        Completion::empty()
    }
}

async fn run_script(
    context: &ExecutionContext,
    evaluator: &dyn Evaluator,
    options: &RunOptions,
    script: &ModuleRecord,
) -> Completion {
    if !options.instantiate {
        debug!("Script skipped for {}", script);
        return Completion::empty();
    }
    if options.evaluate {
        evaluator.evaluate_script(context, script).await
    } else {
        debug!("Evaluation skipped for {}", script);
        Completion::empty()
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Job::TopLevelModuleEvaluation { module, .. } => f
                .debug_tuple("TopLevelModuleEvaluation")
                .field(&module.path())
                .finish(),
            Job::ScriptEvaluation { script, .. } => f
                .debug_tuple("ScriptEvaluation")
                .field(&script.path())
                .finish(),
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Job::TopLevelModuleEvaluation { module, .. } => {
                write!(f, "module evaluation of {}", module.file())
            }
            Job::ScriptEvaluation { script, .. } => {
                write!(f, "script evaluation of {}", script.file())
            }
        }
    }
}

/// FIFO of jobs not yet run
pub struct JobQueue {
    kind: QueueKind,
    jobs: Mutex<VecDeque<Job>>,
}

impl JobQueue {
    /// Empty queue
    pub fn new(kind: QueueKind) -> Self {
        Self {
            kind,
            jobs: Mutex::new(VecDeque::new()),
        }
    }

    /// Which queue this is
    pub fn kind(&self) -> QueueKind {
        self.kind
    }

    /// Append a job at the back
    pub fn enqueue(&self, job: Job) {
        trace!("Enqueued {} on {}", job, self.kind);
        self.jobs.lock().push_back(job);
    }

    /// Remove the job at the front
    pub fn dequeue(&self) -> Option<Job> {
        self.jobs.lock().pop_front()
    }

    /// Number of queued jobs
    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Whether no job is queued
    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }

    /// Drop every job that never ran, returning how many there were
    pub fn dispose(&self) -> usize {
        let dropped: Vec<Job> = self.jobs.lock().drain(..).collect();
        if !dropped.is_empty() {
            debug!("Disposed {} unrun jobs from {}", dropped.len(), self.kind);
        }
        dropped.len()
    }
}

impl fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobQueue")
            .field("kind", &self.kind)
            .field("len", &self.len())
            .finish()
    }
}

/// Handle running jobs use to enqueue more work
#[derive(Clone, Debug)]
pub struct JobSink {
    script: Arc<JobQueue>,
    promise: Arc<JobQueue>,
}

impl JobSink {
    /// Sink feeding the two queues
    pub fn new(script: Arc<JobQueue>, promise: Arc<JobQueue>) -> Self {
        Self { script, promise }
    }

    /// Append `job` to the back of `queue`
    pub fn enqueue(&self, queue: QueueKind, job: Job) {
        match queue {
            QueueKind::Script => self.script.enqueue(job),
            QueueKind::Promise => self.promise.enqueue(job),
        }
    }

    /// Append a continuation to the promise queue
    pub fn enqueue_promise_job(&self, job: Job) {
        self.enqueue(QueueKind::Promise, job);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evalgraph_fs::File;
    use evalgraph_modules::{EcmaModule, ScriptRecord};
    use std::path::Path;

    fn script(path: &str) -> ModuleRecord {
        ModuleRecord::Script(Arc::new(ScriptRecord::new(Arc::new(File::new(
            path,
            Path::new("/"),
        )))))
    }

    fn module(path: &str) -> ModuleRecord {
        ModuleRecord::Ecma(Arc::new(EcmaModule::new(
            Arc::new(File::new(path, Path::new("/"))),
            None,
        )))
    }

    #[test]
    fn test_job_kind_follows_unit() {
        let realm = Arc::new(Realm::new("test"));
        assert!(matches!(
            Job::for_unit(realm.clone(), script("/a.js")),
            Job::ScriptEvaluation { .. }
        ));
        assert!(matches!(
            Job::for_unit(realm, module("/b.js")),
            Job::TopLevelModuleEvaluation { .. }
        ));
    }

    #[test]
    fn test_queue_is_fifo() {
        let realm = Arc::new(Realm::new("test"));
        let queue = JobQueue::new(QueueKind::Script);
        for path in ["/a.js", "/b.js", "/c.js"] {
            queue.enqueue(Job::for_unit(realm.clone(), script(path)));
        }

        let order: Vec<_> = std::iter::from_fn(|| queue.dequeue())
            .map(|job| job.unit().path().to_path_buf())
            .collect();
        assert_eq!(order, ["/a.js", "/b.js", "/c.js"].map(std::path::PathBuf::from));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_sink_appends_to_the_back() {
        let realm = Arc::new(Realm::new("test"));
        let script_jobs = Arc::new(JobQueue::new(QueueKind::Script));
        let promise_jobs = Arc::new(JobQueue::new(QueueKind::Promise));
        let sink = JobSink::new(script_jobs.clone(), promise_jobs.clone());

        promise_jobs.enqueue(Job::for_unit(realm.clone(), module("/first.js")));
        sink.enqueue_promise_job(Job::for_unit(realm.clone(), module("/second.js")));
        sink.enqueue(QueueKind::Script, Job::for_unit(realm, script("/s.js")));

        assert_eq!(script_jobs.len(), 1);
        assert_eq!(
            promise_jobs.dequeue().unwrap().unit().path(),
            Path::new("/first.js")
        );
        assert_eq!(promise_jobs.dispose(), 1);
        assert!(promise_jobs.is_empty());
    }
}
