//! Physical file records

use crate::path::split_base_name;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Coarse classification of a file by its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Executable source (`.js`, `.mjs`, `.ts`, ...)
    Script,
    /// Templates and other markup treated as opaque leaves
    Markup,
    /// Stylesheets
    Stylesheet,
    /// Structured data documents
    Data,
    /// Anything else
    Unknown,
}

impl ContentKind {
    /// Classify an extension (without the leading dot, case-insensitive)
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_ascii_lowercase().as_str() {
            "js" | "mjs" | "cjs" | "jsx" | "ts" | "mts" | "cts" | "tsx" => ContentKind::Script,
            "html" | "htm" | "xhtml" | "xml" | "svg" | "vue" | "hbs" | "ejs" => ContentKind::Markup,
            "css" | "scss" | "sass" | "less" => ContentKind::Stylesheet,
            "json" | "yaml" | "yml" | "toml" => ContentKind::Data,
            _ => ContentKind::Unknown,
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContentKind::Script => "script",
            ContentKind::Markup => "markup",
            ContentKind::Stylesheet => "stylesheet",
            ContentKind::Data => "data",
            ContentKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// One physical file
///
/// Immutable once constructed; shared by `Arc` between packages and module
/// records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct File {
    /// Absolute canonical path
    pub path: PathBuf,

    /// Containing directory
    pub directory: PathBuf,

    /// Path relative to the workspace root (the absolute path when outside it)
    pub relative_path: PathBuf,

    /// File name with extension
    pub base_name: String,

    /// File name without its last extension
    pub name: String,

    /// Last extension, without the dot
    pub extension: String,

    /// Classification derived from the extension
    pub kind: ContentKind,
}

impl File {
    /// Build the record for `path`, relativized against `root`
    pub fn new(path: impl Into<PathBuf>, root: &Path) -> Self {
        let path = path.into();
        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let relative_path = path
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.clone());
        let base_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (name, extension) = split_base_name(&base_name);
        let (name, extension) = (name.to_string(), extension.to_string());
        let kind = ContentKind::from_extension(&extension);

        Self {
            path,
            directory,
            relative_path,
            base_name,
            name,
            extension,
            kind,
        }
    }

    /// The path an extensionless specifier would name
    ///
    /// `src/foo.js` and `src/foo.d.js` give `src/foo`, `src/app.component.js`
    /// gives `src/app.component` and `src/lib/index.js` gives `src/lib`.
    pub fn short_path(&self) -> PathBuf {
        if self.is_index() {
            self.directory.clone()
        } else {
            self.directory.join(self.stem())
        }
    }

    /// Name with a declaration `.d` suffix removed
    pub fn stem(&self) -> &str {
        self.name.strip_suffix(".d").unwrap_or(&self.name)
    }

    /// Whether the file is a type declaration (`foo.d.ts`)
    pub fn is_declaration(&self) -> bool {
        self.stem().len() < self.name.len()
    }

    /// Whether the file is named `index`
    pub fn is_index(&self) -> bool {
        self.stem() == "index"
    }

    /// Whether the file holds executable source
    pub fn is_script(&self) -> bool {
        self.kind == ContentKind::Script
    }

    /// Whether the file is markup
    pub fn is_markup(&self) -> bool {
        self.kind == ContentKind::Markup
    }

    /// Path length in bytes, used to rank otherwise equal candidates
    pub fn path_len(&self) -> usize {
        self.path.as_os_str().len()
    }
}

impl fmt::Display for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.relative_path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_attributes() {
        let file = File::new("/ws/app/src/util.d.ts", Path::new("/ws"));
        assert_eq!(file.directory, PathBuf::from("/ws/app/src"));
        assert_eq!(file.relative_path, PathBuf::from("app/src/util.d.ts"));
        assert_eq!(file.base_name, "util.d.ts");
        assert_eq!(file.name, "util.d");
        assert_eq!(file.extension, "ts");
        assert_eq!(file.kind, ContentKind::Script);
        assert!(file.is_declaration());
        assert_eq!(file.short_path(), PathBuf::from("/ws/app/src/util"));
    }

    #[test]
    fn test_dotted_name_keeps_inner_dots() {
        let file = File::new("/ws/app/src/app.component.js", Path::new("/ws"));
        assert_eq!(file.name, "app.component");
        assert!(!file.is_declaration());
        assert!(!file.is_index());
        assert_eq!(
            file.short_path(),
            PathBuf::from("/ws/app/src/app.component")
        );

        let declaration = File::new("/ws/lib/index.d.ts", Path::new("/ws"));
        assert!(declaration.is_declaration());
        assert!(declaration.is_index());
        assert_eq!(declaration.short_path(), PathBuf::from("/ws/lib"));
    }

    #[test]
    fn test_index_short_path() {
        let file = File::new("/ws/lib/index.mjs", Path::new("/ws"));
        assert!(file.is_index());
        assert_eq!(file.short_path(), PathBuf::from("/ws/lib"));
    }

    #[test]
    fn test_outside_root_keeps_absolute_path() {
        let file = File::new("/elsewhere/view.html", Path::new("/ws"));
        assert_eq!(file.relative_path, PathBuf::from("/elsewhere/view.html"));
        assert!(file.is_markup());
    }

    #[test]
    fn test_content_kinds() {
        assert_eq!(ContentKind::from_extension("TSX"), ContentKind::Script);
        assert_eq!(ContentKind::from_extension("scss"), ContentKind::Stylesheet);
        assert_eq!(ContentKind::from_extension("json"), ContentKind::Data);
        assert_eq!(ContentKind::from_extension(""), ContentKind::Unknown);
    }
}
