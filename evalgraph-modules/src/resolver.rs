//! Import specifier resolution

use crate::{CompilerOptions, ModuleError, ModuleRecord, Result, Workspace};
use evalgraph_fs::path::{ends_with_components, is_relative_specifier, normalize, normalize_specifier};
use evalgraph_fs::File;
use evalgraph_package::Package;
use std::path::Path;
use std::sync::Arc;
use tracing::trace;

fn not_found(specifier: &str, referrer: &ModuleRecord) -> ModuleError {
    ModuleError::ModuleNotFound {
        specifier: specifier.to_string(),
        referrer: referrer.path().to_path_buf(),
    }
}

fn shortest<'a>(files: impl Iterator<Item = &'a Arc<File>>) -> Option<&'a Arc<File>> {
    files.min_by_key(|f| f.path_len())
}

impl Workspace {
    /// The record `specifier` refers to when imported from `referrer`
    pub async fn resolve_import(
        &self,
        specifier: &str,
        referrer: &ModuleRecord,
    ) -> Result<ModuleRecord> {
        self.ensure_live()?;
        let specifier = normalize_specifier(specifier);
        let relative = is_relative_specifier(&specifier);

        let record = match (referrer.package().cloned(), relative) {
            (None, true) => self.resolve_standalone(&specifier, referrer).await?,
            (None, false) => {
                return Err(ModuleError::BareSpecifierInStandalone {
                    specifier,
                    referrer: referrer.path().to_path_buf(),
                })
            }
            (Some(package), true) => self.resolve_relative(&specifier, referrer, &package)?,
            (Some(package), false) => self.resolve_bare(&specifier, referrer, &package).await?,
        };

        trace!("Resolved '{}' from {} to {}", specifier, referrer.file(), record);
        Ok(record)
    }

    /// Sibling lookup for a file outside any package
    async fn resolve_standalone(
        &self,
        specifier: &str,
        referrer: &ModuleRecord,
    ) -> Result<ModuleRecord> {
        let target = normalize(&referrer.file().directory.join(specifier));
        let path = self
            .locate(&target)
            .await
            .ok_or_else(|| not_found(specifier, referrer))?;
        let canonical = self.fs().resolve_symlink(&path).await?;
        let file = self.cached_file(&canonical);
        Ok(self.module_for_file(&file, None))
    }

    /// Relative lookup among the referrer's package files
    ///
    /// Candidates match by path or short path. The shortest path wins, with
    /// scripts preferred over markup and markup over anything else.
    fn resolve_relative(
        &self,
        specifier: &str,
        referrer: &ModuleRecord,
        package: &Arc<Package>,
    ) -> Result<ModuleRecord> {
        let target = normalize(&referrer.file().directory.join(specifier));
        let mut candidates: Vec<&Arc<File>> = package
            .files()
            .iter()
            .filter(|f| f.path == target || f.short_path() == target)
            .collect();
        candidates.sort_by_key(|f| f.path_len());

        let chosen = candidates
            .iter()
            .find(|f| f.is_script())
            .or_else(|| candidates.iter().find(|f| f.is_markup()))
            .or_else(|| candidates.first())
            .ok_or_else(|| not_found(specifier, referrer))?;

        Ok(self.module_for_file(chosen, Some(package)))
    }

    /// Dependency lookup, falling back to path mapping
    async fn resolve_bare(
        &self,
        specifier: &str,
        referrer: &ModuleRecord,
        package: &Arc<Package>,
    ) -> Result<ModuleRecord> {
        let Some(dependency) = package.match_dependency(specifier) else {
            return self.resolve_mapped(specifier, referrer).await;
        };

        let target = self.loader().load_package(&dependency).await?;
        let remainder = specifier[dependency.name().len()..].trim_start_matches('/');
        let entry = target.entry_file();
        let entry_relative = entry.path.strip_prefix(target.directory()).unwrap_or(&entry.path);
        if remainder.is_empty()
            || Path::new(remainder) == target.entry_short_name()
            || Path::new(remainder) == entry_relative
        {
            return Ok(self.module_for_file(entry, Some(&target)));
        }

        let wanted = normalize(&target.directory().join(remainder));
        let files = target.files();
        let found = files
            .iter()
            .find(|f| f.path == wanted)
            .or_else(|| {
                shortest(
                    files
                        .iter()
                        .filter(|f| f.is_script() && !f.is_index() && f.short_path() == wanted),
                )
            })
            .or_else(|| {
                shortest(
                    files
                        .iter()
                        .filter(|f| f.is_script() && f.is_index() && f.directory == wanted),
                )
            })
            .or_else(|| {
                // Canonical paths of a symlinked dependency carry no vendor segment
                shortest(files.iter().filter(|f| {
                    f.short_path()
                        .strip_prefix(target.directory())
                        .is_ok_and(|short| ends_with_components(short, Path::new(remainder)))
                }))
            })
            .ok_or_else(|| not_found(specifier, referrer))?;

        Ok(self.module_for_file(found, Some(&target)))
    }

    /// Resolution through the referrer's `paths` mapping
    async fn resolve_mapped(
        &self,
        specifier: &str,
        referrer: &ModuleRecord,
    ) -> Result<ModuleRecord> {
        let options = self.referrer_options(referrer).await?;
        if !options.has_path_mapping() {
            return Err(ModuleError::NoPathMapping {
                specifier: specifier.to_string(),
                referrer: referrer.path().to_path_buf(),
            });
        }

        let candidates = options
            .map_specifier(specifier)
            .ok_or_else(|| not_found(specifier, referrer))?;
        for candidate in candidates {
            let Some(path) = self.locate(&candidate).await else {
                continue;
            };
            let canonical = self.fs().resolve_symlink(&path).await?;
            let owner = referrer.package().filter(|p| p.file(&canonical).is_some());
            let file = owner
                .and_then(|p| p.file(&canonical))
                .unwrap_or_else(|| self.cached_file(&canonical));
            trace!("Mapped '{}' to {}", specifier, canonical.display());
            return Ok(self.module_for_file(&file, owner));
        }

        Err(not_found(specifier, referrer))
    }

    async fn referrer_options(&self, referrer: &ModuleRecord) -> Result<Arc<CompilerOptions>> {
        match referrer {
            ModuleRecord::Ecma(module) => self.module_compiler_options(module).await,
            other => {
                self.compiler_options_for(
                    other.file().directory.clone(),
                    other.package().map(|p| p.directory().to_path_buf()),
                )
                .await
            }
        }
    }
}
