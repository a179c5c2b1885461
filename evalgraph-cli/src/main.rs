//! evalgraph CLI - load module graphs and drain their jobs

#![warn(missing_docs)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use evalgraph_fs::{CachedFileSystem, DiskFileSystem, FileSystem};
use evalgraph_modules::{EntrySpec, Workspace};
use evalgraph_runtime::{Completion, StaticImportEvaluator};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod config;

use config::Overrides;

#[derive(Parser)]
#[command(name = "evalgraph")]
#[command(about = "Module graph loader and job runner", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, env = "EVALGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load entries and drain the job queues
    Run {
        /// Package directory entry
        #[arg(long = "package", value_name = "DIR")]
        packages: Vec<PathBuf>,

        /// Module file entry
        #[arg(long = "module", value_name = "FILE")]
        modules: Vec<PathBuf>,

        /// Standalone module file entry
        #[arg(long = "standalone-module", value_name = "FILE")]
        standalone_modules: Vec<PathBuf>,

        /// Script file entry
        #[arg(long = "script", value_name = "FILE")]
        scripts: Vec<PathBuf>,

        /// Workspace root (defaults to the configured root, then the current directory)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Evaluate module and script bodies
        #[arg(long)]
        evaluate: bool,

        /// Skip instantiation
        #[arg(long)]
        no_instantiate: bool,
    },

    /// Resolve one import specifier from a module
    Resolve {
        /// Import specifier
        specifier: String,

        /// Module the import is written in
        #[arg(long)]
        from: PathBuf,

        /// Treat the importing module as standalone
        #[arg(long)]
        standalone: bool,

        /// Workspace root (defaults to the configured root, then the current directory)
        #[arg(long)]
        root: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match dispatch(cli).await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {:#}", error);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<ExitCode> {
    let cwd = std::env::current_dir().context("reading current directory")?;
    let config = config::load_config(cli.config.as_deref(), &cwd)?;
    let fs: Arc<dyn FileSystem> = Arc::new(CachedFileSystem::new(Arc::new(DiskFileSystem::new())));

    match cli.command {
        Commands::Run {
            packages,
            modules,
            standalone_modules,
            scripts,
            root,
            evaluate,
            no_instantiate,
        } => {
            let config = Overrides {
                root,
                packages,
                modules,
                standalone_modules,
                scripts,
                evaluate,
                no_instantiate,
            }
            .apply(config)?;
            debug!("Running with {:?}", config);

            let mut result =
                evalgraph_runtime::run(&config, fs, Arc::new(StaticImportEvaluator::new()), &cwd)
                    .await?;

            let code = match result.completion() {
                Completion::Normal(last) => {
                    let stats = result
                        .workspace()
                        .map(|workspace| workspace.stats())
                        .unwrap_or_default();
                    println!(
                        "ok: {} jobs, {} modules, {} scripts{}",
                        result.jobs_run(),
                        stats.modules,
                        stats.scripts,
                        last.as_ref()
                            .map(|unit| format!(", last {}", unit))
                            .unwrap_or_default()
                    );
                    ExitCode::SUCCESS
                }
                Completion::Abrupt(abrupt) => {
                    println!("abrupt after {} jobs: {}", result.jobs_run(), abrupt);
                    ExitCode::FAILURE
                }
            };
            result.dispose();
            Ok(code)
        }

        Commands::Resolve {
            specifier,
            from,
            standalone,
            root,
        } => {
            let config = Overrides {
                root,
                ..Overrides::default()
            }
            .apply(config)?;
            let workspace = Workspace::new(fs, config.resolver.clone(), config.root_or(&cwd));

            let entry = if standalone {
                EntrySpec::standalone_module(from)
            } else {
                EntrySpec::module(from)
            };
            let referrer = workspace.load_entry(&entry).await?;
            let resolved = workspace.resolve_import(&specifier, &referrer).await;
            workspace.dispose();

            let record = resolved?;
            match record.package() {
                Some(package) => println!("{} ({})", record, package.name()),
                None => println!("{}", record),
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
