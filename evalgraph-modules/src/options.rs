//! Compiler options and path mapping

use crate::{ModuleError, Result};
use evalgraph_fs::path::normalize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Options read from a compiler-options document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerOptions {
    /// Base directory for `paths` targets, relative to the document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Specifier patterns and the targets they map to
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub paths: BTreeMap<String, Vec<String>>,

    /// Everything else in `compilerOptions`
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,

    /// Directory of the document these options came from
    #[serde(skip)]
    pub directory: Option<PathBuf>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionsDocument {
    #[serde(default)]
    compiler_options: CompilerOptions,
}

impl CompilerOptions {
    /// Parse the document at `path`
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let document: OptionsDocument =
            serde_json::from_str(text).map_err(|e| ModuleError::InvalidOptions {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        let mut options = document.compiler_options;
        options.directory = path.parent().map(Path::to_path_buf);
        Ok(options)
    }

    /// Whether any `paths` pattern is configured
    pub fn has_path_mapping(&self) -> bool {
        !self.paths.is_empty()
    }

    /// Directory `paths` targets resolve against
    pub fn base_directory(&self) -> Option<PathBuf> {
        let directory = self.directory.as_ref()?;
        Some(match &self.base_url {
            Some(base) => normalize(&directory.join(base)),
            None => directory.clone(),
        })
    }

    /// Candidate paths for `specifier`, in target order
    ///
    /// An exact pattern wins over wildcards; among wildcard patterns the one
    /// with the longest prefix wins. Returns `None` when nothing matches.
    pub fn map_specifier(&self, specifier: &str) -> Option<Vec<PathBuf>> {
        let base = self.base_directory()?;

        let (targets, matched) = match self.paths.get(specifier) {
            Some(targets) if !specifier.contains('*') => (targets, ""),
            _ => self
                .paths
                .iter()
                .filter_map(|(pattern, targets)| {
                    let (prefix, suffix) = pattern.split_once('*')?;
                    if suffix.contains('*')
                        || specifier.len() < prefix.len() + suffix.len()
                        || !specifier.starts_with(prefix)
                        || !specifier.ends_with(suffix)
                    {
                        return None;
                    }
                    let matched = &specifier[prefix.len()..specifier.len() - suffix.len()];
                    Some((prefix.len(), targets, matched))
                })
                .max_by_key(|(prefix_len, _, _)| *prefix_len)
                .map(|(_, targets, matched)| (targets, matched))?,
        };

        Some(
            targets
                .iter()
                .map(|target| normalize(&base.join(target.replacen('*', matched, 1))))
                .collect(),
        )
    }
}
