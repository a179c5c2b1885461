//! Run configuration

use crate::{Result, RuntimeError};
use evalgraph_modules::EntrySpec;
use evalgraph_package::ResolverConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which steps jobs perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Resolve and link each module's dependency graph
    #[serde(default = "default_true")]
    pub instantiate: bool,

    /// Run module and script bodies; requires `instantiate`
    #[serde(default)]
    pub evaluate: bool,
}

fn default_true() -> bool {
    true
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            instantiate: true,
            evaluate: false,
        }
    }
}

impl RunOptions {
    /// Reject evaluation without instantiation
    pub fn validate(&self) -> Result<()> {
        if self.evaluate && !self.instantiate {
            return Err(RuntimeError::InvalidConfig {
                message: "evaluate requires instantiate".to_string(),
            });
        }
        Ok(())
    }
}

/// Everything one run needs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Step gating
    #[serde(flatten)]
    pub options: RunOptions,

    /// Workspace root; relative entries resolve against it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Naming conventions
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Root entries, in run order
    #[serde(default)]
    pub entries: Vec<EntrySpec>,
}

impl RunConfig {
    /// Load and validate a TOML configuration file
    ///
    /// A relative `root` is taken relative to the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RuntimeError::ConfigLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut config = Self::from_toml(&content).map_err(|e| match e {
            RuntimeError::ConfigLoad { message, .. } => RuntimeError::ConfigLoad {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;

        if let (Some(root), Some(dir)) = (&config.root, path.parent()) {
            if root.is_relative() {
                config.root = Some(dir.join(root));
            }
        }
        Ok(config)
    }

    /// Parse and validate TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| RuntimeError::ConfigLoad {
            path: PathBuf::new(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check option consistency
    pub fn validate(&self) -> Result<()> {
        self.options.validate()
    }

    /// The workspace root, defaulting to `fallback`
    pub fn root_or(&self, fallback: &Path) -> PathBuf {
        match &self.root {
            Some(root) if root.is_absolute() => root.clone(),
            Some(root) => fallback.join(root),
            None => fallback.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = RunConfig::from_toml("").unwrap();
        assert!(config.options.instantiate);
        assert!(!config.options.evaluate);
        assert!(config.entries.is_empty());
        assert_eq!(config.resolver, ResolverConfig::default());
    }

    #[test]
    fn test_full_document() {
        let config = RunConfig::from_toml(
            r#"
evaluate = true
root = "/ws"

[resolver]
vendor_dir = "vendor"

[[entries]]
kind = "script"
path = "boot.js"

[[entries]]
kind = "module"
path = "tools/gen.mjs"
standalone = true

[[entries]]
kind = "package"
path = "app"
"#,
        )
        .unwrap();

        assert!(config.options.evaluate);
        assert_eq!(config.resolver.vendor_dir, "vendor");
        assert_eq!(config.resolver.manifest_name, "package.json");
        assert_eq!(
            config.entries,
            vec![
                EntrySpec::script("boot.js"),
                EntrySpec::standalone_module("tools/gen.mjs"),
                EntrySpec::package("app"),
            ]
        );
        assert_eq!(config.root_or(Path::new("/elsewhere")), PathBuf::from("/ws"));
    }

    #[test]
    fn test_evaluate_requires_instantiate() {
        let result = RunConfig::from_toml("instantiate = false\nevaluate = true\n");
        assert!(matches!(result, Err(RuntimeError::InvalidConfig { .. })));
        assert!(RunConfig::from_toml("instantiate = false\n").is_ok());
    }

    #[test]
    fn test_load_resolves_root_against_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("evalgraph.toml");
        fs::write(&path, "root = \"project\"\n").unwrap();

        let config = RunConfig::load(&path).unwrap();
        assert_eq!(config.root, Some(temp_dir.path().join("project")));

        let missing = RunConfig::load(&temp_dir.path().join("absent.toml"));
        assert!(matches!(missing, Err(RuntimeError::ConfigLoad { .. })));
    }
}
