//! Evalgraph runtime
//!
//! This crate drives evaluation of a resolved module graph:
//! - Completion values with abrupt completions carried as data
//! - Realms and execution contexts
//! - Script and promise job queues and the agent that drains them
//! - Structural instantiation of module graphs
//! - The evaluator seam and a static-import evaluator
//! - Run configuration

pub mod agent;
pub mod completion;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod job;
pub mod link;
pub mod realm;

pub use agent::{run, Agent, RunResult};
pub use completion::{Abrupt, Completion, EvalError};
pub use config::{RunConfig, RunOptions};
pub use error::{Result, RuntimeError};
pub use evaluator::{scan_static_imports, Evaluator, StaticImportEvaluator};
pub use job::{Job, JobQueue, JobSink, QueueKind};
pub use link::instantiate;
pub use realm::{ExecutionContext, Realm};
