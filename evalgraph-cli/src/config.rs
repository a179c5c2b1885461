//! Configuration handling for the evalgraph CLI

use anyhow::{Context, Result};
use evalgraph_modules::EntrySpec;
use evalgraph_runtime::RunConfig;
use std::path::{Path, PathBuf};

/// Name of the project-level configuration file
pub const PROJECT_CONFIG: &str = "evalgraph.toml";

/// Load the run configuration
///
/// An explicit path must exist. Otherwise `evalgraph.toml` in `cwd`, then
/// `~/.evalgraph/config.toml`, then the defaults.
pub fn load_config(path: Option<&Path>, cwd: &Path) -> Result<RunConfig> {
    if let Some(path) = path {
        return RunConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()));
    }

    let mut candidates = vec![cwd.join(PROJECT_CONFIG)];
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".evalgraph").join("config.toml"));
    }
    for candidate in candidates {
        if candidate.is_file() {
            return RunConfig::load(&candidate)
                .with_context(|| format!("loading configuration from {}", candidate.display()));
        }
    }
    Ok(RunConfig::default())
}

/// Command-line overrides applied on top of a loaded configuration
#[derive(Debug, Default)]
pub struct Overrides {
    pub root: Option<PathBuf>,
    pub packages: Vec<PathBuf>,
    pub modules: Vec<PathBuf>,
    pub standalone_modules: Vec<PathBuf>,
    pub scripts: Vec<PathBuf>,
    pub evaluate: bool,
    pub no_instantiate: bool,
}

impl Overrides {
    /// Merge into `config`
    ///
    /// Command-line entries follow the configured ones: packages, modules,
    /// standalone modules, then scripts.
    pub fn apply(self, mut config: RunConfig) -> Result<RunConfig> {
        if let Some(root) = self.root {
            config.root = Some(root);
        }
        config
            .entries
            .extend(self.packages.into_iter().map(EntrySpec::package));
        config
            .entries
            .extend(self.modules.into_iter().map(EntrySpec::module));
        config.entries.extend(
            self.standalone_modules
                .into_iter()
                .map(EntrySpec::standalone_module),
        );
        config
            .entries
            .extend(self.scripts.into_iter().map(EntrySpec::script));
        if self.evaluate {
            config.options.evaluate = true;
        }
        if self.no_instantiate {
            config.options.instantiate = false;
        }
        config.validate()?;
        Ok(config)
    }
}
