//! Resolver configuration

use evalgraph_fs::TraversalFilter;
use serde::{Deserialize, Serialize};

/// Naming conventions the package loader and workspace resolve against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Manifest file name at a package root
    #[serde(default = "default_manifest_name")]
    pub manifest_name: String,

    /// Directory dependencies are installed under
    #[serde(default = "default_vendor_dir")]
    pub vendor_dir: String,

    /// Compiler-options document name
    #[serde(default = "default_options_name")]
    pub options_name: String,

    /// Script extensions, in the order they are tried
    #[serde(default = "default_script_extensions")]
    pub script_extensions: Vec<String>,

    /// Name prefix of packages internal to the toolkit
    #[serde(default = "default_internal_prefix")]
    pub internal_prefix: String,

    /// Entry path every internal package uses
    #[serde(default = "default_internal_entry")]
    pub internal_entry: String,

    /// Entry conventions for packages that are the entry point
    #[serde(default = "default_entry_conventions")]
    pub entry_conventions: Vec<String>,

    /// Entry conventions for dependency packages
    #[serde(default = "default_dependency_conventions")]
    pub dependency_conventions: Vec<String>,
}

fn default_manifest_name() -> String {
    "package.json".to_string()
}

fn default_vendor_dir() -> String {
    "node_modules".to_string()
}

fn default_options_name() -> String {
    "tsconfig.json".to_string()
}

fn default_script_extensions() -> Vec<String> {
    ["js", "mjs", "cjs", "jsx", "ts", "tsx"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_internal_prefix() -> String {
    "@evalgraph/".to_string()
}

fn default_internal_entry() -> String {
    "lib/index.js".to_string()
}

fn default_entry_conventions() -> Vec<String> {
    ["index", "app", "startup", "main"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_dependency_conventions() -> Vec<String> {
    ["index", "app", "server"].iter().map(|s| s.to_string()).collect()
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            manifest_name: default_manifest_name(),
            vendor_dir: default_vendor_dir(),
            options_name: default_options_name(),
            script_extensions: default_script_extensions(),
            internal_prefix: default_internal_prefix(),
            internal_entry: default_internal_entry(),
            entry_conventions: default_entry_conventions(),
            dependency_conventions: default_dependency_conventions(),
        }
    }
}

impl ResolverConfig {
    /// Listing filter skipping dot directories and the vendor directory
    pub fn traversal_filter(&self) -> TraversalFilter {
        TraversalFilter::new(self.vendor_dir.clone())
    }

    /// Whether a package name belongs to the toolkit itself
    pub fn is_internal(&self, name: &str) -> bool {
        !self.internal_prefix.is_empty() && name.starts_with(&self.internal_prefix)
    }

    /// Convention list for entry-point or dependency packages
    pub fn conventions(&self, is_entry_point: bool) -> &[String] {
        if is_entry_point {
            &self.entry_conventions
        } else {
            &self.dependency_conventions
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ResolverConfig::default();
        assert_eq!(config.manifest_name, "package.json");
        assert_eq!(config.vendor_dir, "node_modules");
        assert_eq!(config.conventions(true), ["index", "app", "startup", "main"]);
        assert_eq!(config.conventions(false), ["index", "app", "server"]);
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config: ResolverConfig =
            serde_json::from_str(r#"{"manifest_name": "manifest.json"}"#).unwrap();
        assert_eq!(config.manifest_name, "manifest.json");
        assert_eq!(config.options_name, "tsconfig.json");
        assert!(config.is_internal("@evalgraph/runtime"));
        assert!(!config.is_internal("lodash"));
    }
}
