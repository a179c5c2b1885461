//! Package records and entry-file selection

use crate::{Manifest, PackageError, ResolverConfig, Result};
use evalgraph_fs::path::{depth, normalize};
use evalgraph_fs::File;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// A directed edge from an issuing package to a referenced package name
#[derive(Clone)]
pub struct PackageDependency {
    issuer: Arc<Package>,
    name: String,
}

impl PackageDependency {
    /// Edge from `issuer` to `name`
    pub fn new(issuer: Arc<Package>, name: impl Into<String>) -> Self {
        Self {
            issuer,
            name: name.into(),
        }
    }

    /// The package whose manifest declares the dependency
    pub fn issuer(&self) -> &Arc<Package> {
        &self.issuer
    }

    /// The referenced package name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for PackageDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageDependency")
            .field("issuer", &self.issuer.name)
            .field("name", &self.name)
            .finish()
    }
}

/// Everything the builder needs to construct a package
///
/// The builder never touches the file system; the loader gathers these.
#[derive(Debug, Clone)]
pub struct PackageSource {
    /// Workspace root, for relative file paths
    pub root: PathBuf,
    /// Canonical package directory
    pub directory: PathBuf,
    /// Files found under the directory, recursively and filtered
    pub files: Vec<Arc<File>>,
    /// The dependency edge that led here, `None` for an entry point
    pub issuer: Option<PackageDependency>,
    /// Manifest location
    pub manifest_path: PathBuf,
    /// Raw manifest text
    pub manifest_text: String,
    /// Entry file chosen by the caller, if any
    pub entry_file: Option<PathBuf>,
}

/// One resolvable unit of files sharing a manifest
///
/// Immutable after construction. Every package has exactly one entry file.
pub struct Package {
    name: String,
    directory: PathBuf,
    files: Vec<Arc<File>>,
    manifest_file: Arc<File>,
    manifest: Manifest,
    entry_file: Arc<File>,
    dependencies: Vec<String>,
    is_entry_point: bool,
    is_internal: bool,
    has_explicit_entry_file: bool,
}

impl Package {
    /// Construct a package, selecting its entry file
    pub fn build(source: PackageSource, config: &ResolverConfig) -> Result<Self> {
        let PackageSource {
            root,
            directory,
            mut files,
            issuer,
            manifest_path,
            manifest_text,
            entry_file,
        } = source;

        files.sort_by(|a, b| a.path.cmp(&b.path));
        files.dedup_by(|a, b| a.path == b.path);

        let manifest = Manifest::parse(&manifest_text, &manifest_path)?;
        let name = manifest.name.clone().unwrap_or_else(|| {
            directory
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        let manifest_file = find_file(&files, &manifest_path)
            .unwrap_or_else(|| Arc::new(File::new(manifest_path.clone(), &root)));
        let is_entry_point = issuer.is_none();
        let is_internal = config.is_internal(&name);

        let (entry_file, has_explicit_entry_file) = match entry_file {
            Some(path) => {
                let file = find_file(&files, &path)
                    .unwrap_or_else(|| Arc::new(File::new(path, &root)));
                (file, true)
            }
            None => {
                let file = select_entry_file(
                    &name,
                    &directory,
                    &files,
                    &manifest,
                    is_entry_point,
                    is_internal,
                    config,
                )?;
                (file, false)
            }
        };

        debug!(
            "Package {} in {} has entry {}",
            name,
            directory.display(),
            entry_file.path.display()
        );

        Ok(Self {
            dependencies: manifest.dependency_names(),
            name,
            directory,
            files,
            manifest_file,
            manifest,
            entry_file,
            is_entry_point,
            is_internal,
            has_explicit_entry_file,
        })
    }

    /// Canonical package name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical package directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// All files of the package, sorted by path
    pub fn files(&self) -> &[Arc<File>] {
        &self.files
    }

    /// The manifest file
    pub fn manifest_file(&self) -> &Arc<File> {
        &self.manifest_file
    }

    /// The parsed manifest
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// The resolved entry file
    pub fn entry_file(&self) -> &Arc<File> {
        &self.entry_file
    }

    /// Declared dependency names
    pub fn dependency_names(&self) -> &[String] {
        &self.dependencies
    }

    /// Whether the package was loaded without an issuer
    pub fn is_entry_point(&self) -> bool {
        self.is_entry_point
    }

    /// Whether the package belongs to the toolkit itself
    pub fn is_internal(&self) -> bool {
        self.is_internal
    }

    /// Whether the entry file was supplied rather than selected
    pub fn has_explicit_entry_file(&self) -> bool {
        self.has_explicit_entry_file
    }

    /// Look up a file of the package by canonical path
    pub fn file(&self, path: &Path) -> Option<Arc<File>> {
        find_file(&self.files, path)
    }

    /// Entry file's short path relative to the package directory
    ///
    /// Empty for a top-level `index` entry.
    pub fn entry_short_name(&self) -> PathBuf {
        self.entry_file
            .short_path()
            .strip_prefix(&self.directory)
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// Edge to a declared dependency
    pub fn dependency(self: &Arc<Self>, name: &str) -> Option<PackageDependency> {
        self.dependencies
            .iter()
            .find(|d| d.as_str() == name)
            .map(|d| PackageDependency::new(Arc::clone(self), d.clone()))
    }

    /// Edge to the dependency a bare specifier names
    ///
    /// Matches `name` exactly or as a `name/` prefix; the longest declared
    /// name wins so `@scope/a` beats `@scope`.
    pub fn match_dependency(self: &Arc<Self>, specifier: &str) -> Option<PackageDependency> {
        self.dependencies
            .iter()
            .filter(|name| {
                specifier == name.as_str()
                    || specifier
                        .strip_prefix(name.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .max_by_key(|name| name.len())
            .map(|name| PackageDependency::new(Arc::clone(self), name.clone()))
    }
}

impl fmt::Debug for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Package")
            .field("name", &self.name)
            .field("directory", &self.directory)
            .field("entry_file", &self.entry_file.path)
            .field("files", &self.files.len())
            .field("dependencies", &self.dependencies)
            .field("is_entry_point", &self.is_entry_point)
            .finish()
    }
}

fn find_file(files: &[Arc<File>], path: &Path) -> Option<Arc<File>> {
    files
        .binary_search_by(|f| f.path.as_path().cmp(path))
        .ok()
        .map(|i| Arc::clone(&files[i]))
}

fn select_entry_file(
    name: &str,
    directory: &Path,
    files: &[Arc<File>],
    manifest: &Manifest,
    is_entry_point: bool,
    is_internal: bool,
    config: &ResolverConfig,
) -> Result<Arc<File>> {
    if is_internal {
        if let Some(file) = resolve_declared_entry(directory, &config.internal_entry, files, config) {
            return Ok(file);
        }
        warn!(
            "Internal package {} has no {}, falling back to conventions",
            name, config.internal_entry
        );
    } else if let Some(declared) = manifest.entry_path() {
        if let Some(file) = resolve_declared_entry(directory, declared, files, config) {
            return Ok(file);
        }
        warn!(
            "Package {} declares entry {} which does not exist, falling back to conventions",
            name, declared
        );
    }

    rank_entry_candidates(files, directory, config.conventions(is_entry_point))
        .into_iter()
        .next()
        .ok_or_else(|| PackageError::NoEntryFile {
            package: name.to_string(),
            directory: directory.to_path_buf(),
        })
}

/// Resolve a manifest entry path against the package files
///
/// Tries the literal path, then the path with each script extension
/// appended, then the path as a directory holding an `index` script.
pub fn resolve_declared_entry(
    directory: &Path,
    declared: &str,
    files: &[Arc<File>],
    config: &ResolverConfig,
) -> Option<Arc<File>> {
    let target = normalize(&directory.join(declared.trim_start_matches("./")));
    if let Some(file) = find_file(files, &target) {
        return Some(file);
    }

    let with_extension = config.script_extensions.iter().find_map(|ext| {
        let mut candidate = target.clone().into_os_string();
        candidate.push(".");
        candidate.push(ext);
        find_file(files, Path::new(&candidate))
    });
    if with_extension.is_some() {
        return with_extension;
    }

    config
        .script_extensions
        .iter()
        .find_map(|ext| find_file(files, &target.join(format!("index.{}", ext))))
}

/// Order script files by how well they fit an entry-file convention
///
/// A file matching a convention name outranks one that does not, at any
/// depth. Otherwise the shallower file wins. At equal depth, earlier
/// conventions outrank later ones and remaining ties break alphabetically.
/// Declaration files (`index.d.ts`) are never candidates.
pub fn rank_entry_candidates(
    files: &[Arc<File>],
    directory: &Path,
    conventions: &[String],
) -> Vec<Arc<File>> {
    let mut candidates: Vec<_> = files
        .iter()
        .filter(|f| f.is_script() && !f.is_declaration())
        .map(|f| {
            let relative = f.path.strip_prefix(directory).unwrap_or(&f.path);
            let convention = conventions.iter().position(|c| c == &f.name);
            let key = (
                convention.is_none(),
                depth(relative),
                convention.unwrap_or(usize::MAX),
                f.base_name.clone(),
                f.path.clone(),
            );
            (key, Arc::clone(f))
        })
        .collect();

    candidates.sort_by(|a, b| a.0.cmp(&b.0));
    candidates.into_iter().map(|(_, f)| f).collect()
}
