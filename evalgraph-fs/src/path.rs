//! Lexical path helpers
//!
//! None of these touch the file system. Canonicalization through symlinks is
//! the job of `FileSystem::resolve_symlink`.

use std::path::{Component, Path, PathBuf};

/// Resolve `.` and `..` components without consulting the file system
///
/// A `..` that would climb above the root is dropped.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let at_root = matches!(
                    out.components().next_back(),
                    None | Some(Component::RootDir)
                        | Some(Component::Prefix(_))
                        | Some(Component::ParentDir)
                );
                if !at_root {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Rewrite an import specifier to use `/` separators
pub fn normalize_specifier(specifier: &str) -> String {
    specifier.replace('\\', "/")
}

/// Whether a specifier is resolved against the importing file's directory
///
/// That covers `./x`, `../x`, `.`, `..` and rooted disk paths.
pub fn is_relative_specifier(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || Path::new(specifier).has_root()
}

/// Number of separators in a path relative to some base
pub fn depth(relative: &Path) -> usize {
    relative.components().count().saturating_sub(1)
}

/// Everything before the first `vendor_dir` segment of `path`
///
/// `/ws/node_modules/a/node_modules/b` with `node_modules` gives `/ws`.
pub fn vendor_root(path: &Path, vendor_dir: &str) -> Option<PathBuf> {
    let mut root = PathBuf::new();
    for component in path.components() {
        if component.as_os_str() == vendor_dir {
            return Some(root);
        }
        root.push(component.as_os_str());
    }
    None
}

/// Split a base name into (name without extension, extension)
///
/// Only the last extension is removed, so `foo.d.ts` splits into `foo.d`
/// and `ts`. A leading dot is part of the name.
pub fn split_base_name(base_name: &str) -> (&str, &str) {
    match base_name.rfind('.') {
        Some(last) if last > 0 => (&base_name[..last], &base_name[last + 1..]),
        _ => (base_name, ""),
    }
}

/// Whether `path` ends with the relative path `suffix`, component-wise
pub fn ends_with_components(path: &Path, suffix: &Path) -> bool {
    suffix.components().next().is_some() && path.ends_with(suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_dots() {
        assert_eq!(
            normalize(Path::new("/ws/src/./lib/../util.js")),
            PathBuf::from("/ws/src/util.js")
        );
        assert_eq!(normalize(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn test_relative_specifiers() {
        assert!(is_relative_specifier("./foo"));
        assert!(is_relative_specifier("../foo"));
        assert!(is_relative_specifier(".."));
        assert!(is_relative_specifier("/abs/foo.js"));
        assert!(!is_relative_specifier("lodash"));
        assert!(!is_relative_specifier("@scope/pkg/sub"));
        assert!(!is_relative_specifier(".hidden"));
    }

    #[test]
    fn test_vendor_root() {
        assert_eq!(
            vendor_root(Path::new("/ws/node_modules/a/node_modules/b"), "node_modules"),
            Some(PathBuf::from("/ws"))
        );
        assert_eq!(vendor_root(Path::new("/ws/src"), "node_modules"), None);
    }

    #[test]
    fn test_split_base_name() {
        assert_eq!(split_base_name("foo.js"), ("foo", "js"));
        assert_eq!(split_base_name("foo.d.ts"), ("foo.d", "ts"));
        assert_eq!(split_base_name("app.component.js"), ("app.component", "js"));
        assert_eq!(split_base_name("Makefile"), ("Makefile", ""));
        assert_eq!(split_base_name(".eslintrc.js"), (".eslintrc", "js"));
        assert_eq!(split_base_name(".env"), (".env", ""));
    }

    #[test]
    fn test_depth() {
        assert_eq!(depth(Path::new("index.js")), 0);
        assert_eq!(depth(Path::new("src/lib/app.js")), 2);
    }
}
