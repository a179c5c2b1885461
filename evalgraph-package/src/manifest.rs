//! Package manifest (package.json) handling

use crate::{PackageError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// The subset of a package manifest the resolver reads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Package name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Package version, informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// CommonJS-style entry path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,

    /// ES-module entry path, preferred over `main`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,

    /// Runtime dependencies; only the keys are used
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, serde_json::Value>,
}

impl Manifest {
    /// Parse a manifest read from `path`
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let manifest: Self =
            serde_json::from_str(text).map_err(|e| PackageError::InvalidManifest {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        manifest.validate(path)?;
        Ok(manifest)
    }

    /// Reject manifests whose declared names are empty
    pub fn validate(&self, path: &Path) -> Result<()> {
        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err(PackageError::InvalidManifest {
                path: path.to_path_buf(),
                message: "Package name cannot be empty".to_string(),
            });
        }

        if let Some(empty) = self.dependencies.keys().find(|name| name.trim().is_empty()) {
            return Err(PackageError::InvalidManifest {
                path: path.to_path_buf(),
                message: format!("Invalid dependency name: {:?}", empty),
            });
        }

        Ok(())
    }

    /// Declared entry path; `module` wins over `main`
    pub fn entry_path(&self) -> Option<&str> {
        self.module
            .as_deref()
            .or(self.main.as_deref())
            .filter(|p| !p.trim().is_empty())
    }

    /// Declared dependency names, sorted
    pub fn dependency_names(&self) -> Vec<String> {
        self.dependencies.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_parsing() {
        let json = r#"{
            "name": "test-package",
            "version": "1.0.0",
            "main": "lib/main.js",
            "dependencies": {
                "foo": "^1.0.0",
                "bar": { "version": "2.0.0" }
            }
        }"#;

        let manifest = Manifest::parse(json, Path::new("/p/package.json")).unwrap();
        assert_eq!(manifest.name.as_deref(), Some("test-package"));
        assert_eq!(manifest.entry_path(), Some("lib/main.js"));
        assert_eq!(manifest.dependency_names(), vec!["bar", "foo"]);
    }

    #[test]
    fn test_module_wins_over_main() {
        let json = r#"{"main": "index.cjs", "module": "index.mjs"}"#;
        let manifest = Manifest::parse(json, Path::new("package.json")).unwrap();
        assert_eq!(manifest.entry_path(), Some("index.mjs"));
        assert_eq!(manifest.name, None);
    }

    #[test]
    fn test_invalid_documents() {
        assert!(matches!(
            Manifest::parse("{ not json", Path::new("package.json")),
            Err(PackageError::InvalidManifest { .. })
        ));
        assert!(Manifest::parse(r#"{"name": "  "}"#, Path::new("package.json")).is_err());
    }
}
