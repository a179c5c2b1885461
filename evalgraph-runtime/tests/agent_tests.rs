//! Integration tests for the agent drain loop

use async_trait::async_trait;
use evalgraph_fs::{FileSystem, MemoryFileSystem};
use evalgraph_modules::{EntrySpec, ModuleRecord, Workspace};
use evalgraph_package::ResolverConfig;
use evalgraph_runtime::{
    run, Agent, Completion, EvalError, Evaluator, ExecutionContext, Job, RunConfig, RunOptions,
    RuntimeError, StaticImportEvaluator,
};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Default)]
struct RecordingEvaluator {
    log: Mutex<Vec<String>>,
    depths: Mutex<Vec<usize>>,
    fail_on: Option<PathBuf>,
    continuation: Option<(PathBuf, PathBuf)>,
}

impl RecordingEvaluator {
    fn failing_on(path: &str) -> Self {
        Self {
            fail_on: Some(PathBuf::from(path)),
            ..Self::default()
        }
    }

    fn with_continuation(trigger: &str, script: &str) -> Self {
        Self {
            continuation: Some((PathBuf::from(trigger), PathBuf::from(script))),
            ..Self::default()
        }
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    async fn evaluate(&self, kind: &str, context: &ExecutionContext, unit: &ModuleRecord) -> Completion {
        self.log
            .lock()
            .push(format!("{}:{}", kind, unit.path().display()));
        self.depths.lock().push(context.realm().depth());

        if let Some((trigger, script)) = &self.continuation {
            if unit.path() == trigger {
                let record = context
                    .workspace()
                    .load_entry(&EntrySpec::script(script))
                    .await
                    .unwrap();
                context
                    .jobs()
                    .enqueue_promise_job(Job::for_unit(context.realm().clone(), record));
            }
        }

        if self.fail_on.as_deref() == Some(unit.path()) {
            return Completion::abrupt(EvalError::new("boom"), unit.clone());
        }
        Completion::empty()
    }
}

#[async_trait]
impl Evaluator for RecordingEvaluator {
    async fn requested_modules(
        &self,
        workspace: &Workspace,
        module: &ModuleRecord,
    ) -> Completion<Vec<String>> {
        StaticImportEvaluator.requested_modules(workspace, module).await
    }

    async fn link(&self, module: &ModuleRecord, _dependencies: &[ModuleRecord]) -> Completion {
        self.log
            .lock()
            .push(format!("link:{}", module.path().display()));
        Completion::empty()
    }

    async fn evaluate_module(&self, context: &ExecutionContext, module: &ModuleRecord) -> Completion {
        self.evaluate("module", context, module).await
    }

    async fn evaluate_script(&self, context: &ExecutionContext, script: &ModuleRecord) -> Completion {
        self.evaluate("script", context, script).await
    }
}

fn fixture() -> Arc<MemoryFileSystem> {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.add_file("/ws/app/package.json", r#"{"name": "app"}"#)
        .add_file("/ws/app/index.js", "import './a';\nimport './view.html';\n")
        .add_file("/ws/app/a.js", "import { b } from './b';\nexport const a = 1;\n")
        .add_file("/ws/app/b.js", "import { a } from './a';\nexport const b = 2;\n")
        .add_file("/ws/app/view.html", "<p></p>")
        .add_file("/ws/app/broken.js", "import './missing';\n")
        .add_file("/ws/one.js", "")
        .add_file("/ws/two.js", "")
        .add_file("/ws/three.js", "");
    fs
}

fn workspace(fs: &Arc<MemoryFileSystem>) -> Workspace {
    Workspace::new(fs.clone() as Arc<dyn FileSystem>, ResolverConfig::default(), "/ws")
}

fn evaluating() -> RunOptions {
    RunOptions {
        instantiate: true,
        evaluate: true,
    }
}

fn scripts() -> Vec<EntrySpec> {
    vec![
        EntrySpec::script("one.js"),
        EntrySpec::script("two.js"),
        EntrySpec::script("three.js"),
    ]
}

#[tokio::test]
async fn test_seed_order_is_entry_order() {
    let fs = fixture();
    let evaluator = Arc::new(RecordingEvaluator::default());
    let agent = Agent::new(evaluator.clone(), evaluating());

    let result = agent.run_jobs(workspace(&fs), &scripts()).await.unwrap();

    assert_eq!(
        evaluator.log(),
        vec!["script:/ws/one.js", "script:/ws/two.js", "script:/ws/three.js"]
    );
    assert_eq!(result.jobs_run(), 3);
    let last = result.completion().value().unwrap().as_ref().unwrap();
    assert_eq!(last.path(), Path::new("/ws/three.js"));
}

#[tokio::test]
async fn test_abrupt_job_stops_the_run() {
    let fs = fixture();
    let evaluator = Arc::new(RecordingEvaluator::failing_on("/ws/two.js"));
    let agent = Agent::new(evaluator.clone(), evaluating());

    let result = agent.run_jobs(workspace(&fs), &scripts()).await.unwrap();

    assert!(result.is_abrupt());
    let abrupt = result.completion().as_abrupt().unwrap();
    assert_eq!(abrupt.unit().path(), Path::new("/ws/two.js"));
    assert_eq!(abrupt.error().message, "boom");
    assert_eq!(result.jobs_run(), 2);
    assert!(!evaluator.log().contains(&"script:/ws/three.js".to_string()));
}

#[tokio::test]
async fn test_evaluate_false_still_instantiates() {
    let fs = fixture();
    let evaluator = Arc::new(RecordingEvaluator::default());
    let agent = Agent::new(evaluator.clone(), RunOptions::default());

    let result = agent
        .run_jobs(workspace(&fs), &[EntrySpec::package("app"), EntrySpec::script("one.js")])
        .await
        .unwrap();

    assert!(!result.is_abrupt());
    assert_eq!(
        evaluator.log(),
        vec!["link:/ws/app/index.js", "link:/ws/app/a.js", "link:/ws/app/b.js"]
    );
    let workspace = result.workspace().unwrap();
    assert!(workspace.module(Path::new("/ws/app/view.html")).is_some());
}

#[tokio::test]
async fn test_instantiate_false_skips_everything() {
    let fs = fixture();
    let evaluator = Arc::new(RecordingEvaluator::default());
    let options = RunOptions {
        instantiate: false,
        evaluate: false,
    };
    let agent = Agent::new(evaluator.clone(), options);

    let result = agent
        .run_jobs(workspace(&fs), &[EntrySpec::package("app"), EntrySpec::script("one.js")])
        .await
        .unwrap();

    assert!(evaluator.log().is_empty());
    assert_eq!(result.jobs_run(), 2);
}

#[tokio::test]
async fn test_evaluate_without_instantiate_is_rejected() {
    let fs = fixture();
    let agent = Agent::new(
        Arc::new(RecordingEvaluator::default()),
        RunOptions {
            instantiate: false,
            evaluate: true,
        },
    );
    let result = agent.run_jobs(workspace(&fs), &scripts()).await;
    assert!(matches!(result, Err(RuntimeError::InvalidConfig { .. })));
}

#[tokio::test]
async fn test_promise_jobs_run_after_script_jobs() {
    let fs = fixture();
    let evaluator = Arc::new(RecordingEvaluator::with_continuation(
        "/ws/one.js",
        "three.js",
    ));
    let agent = Agent::new(evaluator.clone(), evaluating());

    let result = agent
        .run_jobs(workspace(&fs), &[EntrySpec::script("one.js"), EntrySpec::script("two.js")])
        .await
        .unwrap();

    assert_eq!(
        evaluator.log(),
        vec!["script:/ws/one.js", "script:/ws/two.js", "script:/ws/three.js"]
    );
    assert_eq!(result.jobs_run(), 3);
    assert_eq!(*evaluator.depths.lock(), vec![1, 1, 1]);
}

#[tokio::test]
async fn test_unresolvable_import_is_abrupt() {
    let fs = fixture();
    let evaluator = Arc::new(RecordingEvaluator::default());
    let agent = Agent::new(evaluator.clone(), evaluating());

    let result = agent
        .run_jobs(workspace(&fs), &[EntrySpec::module("app/broken.js"), EntrySpec::script("one.js")])
        .await
        .unwrap();

    let abrupt = result.completion().as_abrupt().unwrap();
    assert_eq!(abrupt.unit().path(), Path::new("/ws/app/broken.js"));
    assert_eq!(abrupt.error().specifier.as_deref(), Some("./missing"));
    assert!(evaluator.log().is_empty());
}

#[tokio::test]
async fn test_structural_error_disposes_workspace() {
    let fs = fixture();
    let workspace = workspace(&fs);
    let agent = Agent::new(Arc::new(RecordingEvaluator::default()), RunOptions::default());

    let result = agent
        .run_jobs(workspace.clone(), &[EntrySpec::package("nowhere")])
        .await;

    assert!(matches!(result, Err(RuntimeError::Module(_))));
    assert!(workspace.is_disposed());
}

#[tokio::test]
async fn test_result_owns_and_disposes_workspace() {
    let fs = fixture();
    let workspace = workspace(&fs);
    let agent = Agent::new(Arc::new(RecordingEvaluator::default()), RunOptions::default());

    let mut result = agent.run_jobs(workspace.clone(), &[]).await.unwrap();
    assert_eq!(result.jobs_run(), 0);
    assert!(matches!(result.completion(), Completion::Normal(None)));

    result.dispose();
    result.dispose();
    assert!(result.workspace().is_none());
    assert!(workspace.is_disposed());
}

#[tokio::test]
async fn test_run_from_config() {
    let fs = fixture();
    let config = RunConfig::from_toml(
        r#"
root = "/ws"

[[entries]]
kind = "package"
path = "app"
"#,
    )
    .unwrap();

    let mut result = run(
        &config,
        fs.clone() as Arc<dyn FileSystem>,
        Arc::new(StaticImportEvaluator::new()),
        Path::new("/"),
    )
    .await
    .unwrap();

    assert!(!result.is_abrupt());
    assert_eq!(result.workspace().unwrap().stats().modules, 4);
    result.dispose();
}
