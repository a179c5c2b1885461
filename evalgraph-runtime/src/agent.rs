//! The agent: seeds the job queues and drains them

use crate::{
    Completion, Evaluator, Job, JobQueue, JobSink, QueueKind, Realm, Result, RunConfig,
    RunOptions,
};
use evalgraph_fs::FileSystem;
use evalgraph_modules::{EntrySpec, ModuleRecord, Workspace};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, trace, warn};

/// Outcome of one run
///
/// Owns the workspace so every cache stays inspectable until `dispose`.
#[derive(Debug)]
pub struct RunResult {
    completion: Completion<Option<ModuleRecord>>,
    jobs_run: usize,
    workspace: Option<Workspace>,
}

impl RunResult {
    fn new(
        completion: Completion<Option<ModuleRecord>>,
        jobs_run: usize,
        workspace: Workspace,
    ) -> Self {
        Self {
            completion,
            jobs_run,
            workspace: Some(workspace),
        }
    }

    /// Normal with the last unit run (`None` if nothing ran), or the first abrupt completion
    pub fn completion(&self) -> &Completion<Option<ModuleRecord>> {
        &self.completion
    }

    /// Whether the run stopped on an abrupt completion
    pub fn is_abrupt(&self) -> bool {
        self.completion.is_abrupt()
    }

    /// Number of jobs that ran, including a failing one
    pub fn jobs_run(&self) -> usize {
        self.jobs_run
    }

    /// The workspace, until disposed
    pub fn workspace(&self) -> Option<&Workspace> {
        self.workspace.as_ref()
    }

    /// Dispose the workspace; later calls do nothing
    pub fn dispose(&mut self) {
        if let Some(workspace) = self.workspace.take() {
            workspace.dispose();
        }
    }
}

/// Runs the jobs of one realm
pub struct Agent {
    evaluator: Arc<dyn Evaluator>,
    options: RunOptions,
    script_jobs: Arc<JobQueue>,
    promise_jobs: Arc<JobQueue>,
}

impl Agent {
    /// Agent driving `evaluator` with `options`
    pub fn new(evaluator: Arc<dyn Evaluator>, options: RunOptions) -> Self {
        Self {
            evaluator,
            options,
            script_jobs: Arc::new(JobQueue::new(QueueKind::Script)),
            promise_jobs: Arc::new(JobQueue::new(QueueKind::Promise)),
        }
    }

    /// Step gating in effect
    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Handle onto both queues
    pub fn sink(&self) -> JobSink {
        JobSink::new(Arc::clone(&self.script_jobs), Arc::clone(&self.promise_jobs))
    }

    /// Load `entries`, seed the script queue with them in order, and drain
    ///
    /// Structural errors while loading entries are returned as errors and
    /// dispose the workspace. Once draining starts, the first abrupt
    /// completion ends the run.
    pub async fn run_jobs(&self, workspace: Workspace, entries: &[EntrySpec]) -> Result<RunResult> {
        self.options.validate()?;
        let units = match workspace.load_entry_files(entries).await {
            Ok(units) => units,
            Err(error) => {
                workspace.dispose();
                return Err(error.into());
            }
        };

        let realm = Arc::new(Realm::new("main"));
        for unit in units {
            self.script_jobs
                .enqueue(Job::for_unit(Arc::clone(&realm), unit));
        }

        let mut last = None;
        let mut jobs_run = 0;
        while let Some((queue, job)) = self.next_job() {
            trace!("Running {} from {}", job, queue);
            jobs_run += 1;

            let completion = job
                .run(&workspace, self.evaluator.as_ref(), &self.options, self.sink())
                .await;
            match completion {
                Completion::Normal(()) => last = Some(job.unit().clone()),
                Completion::Abrupt(abrupt) => {
                    warn!("Run ended abruptly after {} jobs: {}", jobs_run, abrupt);
                    self.dispose();
                    return Ok(RunResult::new(
                        Completion::Abrupt(abrupt),
                        jobs_run,
                        workspace,
                    ));
                }
            }
        }

        info!("Drained job queues after {} jobs", jobs_run);
        self.dispose();
        Ok(RunResult::new(Completion::Normal(last), jobs_run, workspace))
    }

    fn next_job(&self) -> Option<(QueueKind, Job)> {
        if let Some(job) = self.script_jobs.dequeue() {
            return Some((QueueKind::Script, job));
        }
        self.promise_jobs
            .dequeue()
            .map(|job| (QueueKind::Promise, job))
    }

    /// Drop every job still queued
    pub fn dispose(&self) {
        self.script_jobs.dispose();
        self.promise_jobs.dispose();
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("options", &self.options)
            .field("script_jobs", &self.script_jobs)
            .field("promise_jobs", &self.promise_jobs)
            .finish()
    }
}

/// Run everything a configuration names
///
/// The workspace root is the configured root, or `cwd` when none is set.
pub async fn run(
    config: &RunConfig,
    fs: Arc<dyn FileSystem>,
    evaluator: Arc<dyn Evaluator>,
    cwd: &Path,
) -> Result<RunResult> {
    config.validate()?;
    let workspace = Workspace::new(fs, config.resolver.clone(), config.root_or(cwd));
    Agent::new(evaluator, config.options)
        .run_jobs(workspace, &config.entries)
        .await
}
