//! Root entries of a run

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One caller-supplied root of the module graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EntrySpec {
    /// A standalone script file
    Script {
        /// Script path
        path: PathBuf,
    },
    /// A module file, inside a package unless `standalone`
    Module {
        /// Module path
        path: PathBuf,
        /// Skip package discovery for this file
        #[serde(default)]
        standalone: bool,
    },
    /// A package directory, evaluated through its entry file
    Package {
        /// Package directory
        path: PathBuf,
    },
}

impl EntrySpec {
    /// Script entry
    pub fn script(path: impl Into<PathBuf>) -> Self {
        EntrySpec::Script { path: path.into() }
    }

    /// Module entry inside its owning package
    pub fn module(path: impl Into<PathBuf>) -> Self {
        EntrySpec::Module {
            path: path.into(),
            standalone: false,
        }
    }

    /// Module entry outside any package
    pub fn standalone_module(path: impl Into<PathBuf>) -> Self {
        EntrySpec::Module {
            path: path.into(),
            standalone: true,
        }
    }

    /// Package directory entry
    pub fn package(path: impl Into<PathBuf>) -> Self {
        EntrySpec::Package { path: path.into() }
    }

    /// The path the entry names
    pub fn path(&self) -> &Path {
        match self {
            EntrySpec::Script { path }
            | EntrySpec::Module { path, .. }
            | EntrySpec::Package { path } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_representation() {
        let entries: Vec<EntrySpec> = serde_json::from_str(
            r#"[
                {"kind": "script", "path": "run.js"},
                {"kind": "module", "path": "app/main.js"},
                {"kind": "module", "path": "tool.mjs", "standalone": true},
                {"kind": "package", "path": "app"}
            ]"#,
        )
        .unwrap();
        assert_eq!(
            entries,
            vec![
                EntrySpec::script("run.js"),
                EntrySpec::module("app/main.js"),
                EntrySpec::standalone_module("tool.mjs"),
                EntrySpec::package("app"),
            ]
        );
        assert_eq!(entries[3].path(), Path::new("app"));
    }
}
