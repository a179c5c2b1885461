//! Integration tests for the package loader

use evalgraph_fs::{FileSystem, MemoryFileSystem};
use evalgraph_package::{PackageError, PackageLoader, ResolverConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn workspace() -> Arc<MemoryFileSystem> {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.add_file(
        "/ws/app/package.json",
        r#"{"name": "app", "dependencies": {"lib": "^1.0.0", "missing": "1"}}"#,
    )
    .add_file("/ws/app/index.js", "import 'lib';")
    .add_file("/ws/app/src/util.js", "")
    .add_file("/ws/node_modules/lib/package.json", r#"{"name": "lib", "main": "dist/lib"}"#)
    .add_file("/ws/node_modules/lib/dist/lib.js", "")
    .add_file("/ws/node_modules/lib/server.js", "");
    fs
}

fn loader(fs: &Arc<MemoryFileSystem>) -> PackageLoader {
    PackageLoader::new(fs.clone() as Arc<dyn FileSystem>, ResolverConfig::default(), "/ws")
}

#[tokio::test]
async fn test_entry_package_from_directory() {
    let fs = workspace();
    let loader = loader(&fs);

    let package = loader.load_entry_package(Path::new("app")).await.unwrap();
    assert_eq!(package.name(), "app");
    assert!(package.is_entry_point());
    assert!(!package.has_explicit_entry_file());
    assert_eq!(package.entry_file().path, PathBuf::from("/ws/app/index.js"));
    assert_eq!(package.dependency_names(), ["lib", "missing"]);
}

#[tokio::test]
async fn test_entry_package_from_nested_file() {
    let fs = workspace();
    let loader = loader(&fs);

    let package = loader
        .load_entry_package(Path::new("/ws/app/src/util.js"))
        .await
        .unwrap();
    assert_eq!(package.directory(), Path::new("/ws/app"));
    assert!(package.has_explicit_entry_file());
    assert_eq!(package.entry_file().path, PathBuf::from("/ws/app/src/util.js"));
    assert_eq!(
        package.entry_file().relative_path,
        PathBuf::from("app/src/util.js")
    );
}

#[tokio::test]
async fn test_entry_package_without_manifest() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.add_file("/loose/script.js", "");
    let loader = loader(&fs);

    let result = loader.load_entry_package(Path::new("/loose/script.js")).await;
    assert!(matches!(result, Err(PackageError::NoManifestFound { .. })));
}

#[tokio::test]
async fn test_entry_main_is_used_without_convention_search() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.add_file("/p/package.json", r#"{"main": "src/app.js"}"#)
        .add_file("/p/src/app.js", "")
        .add_file("/p/src/util.js", "")
        .add_file("/p/index.js", "");
    let loader = loader(&fs);

    let package = loader.load_entry_package(Path::new("/p")).await.unwrap();
    assert_eq!(package.entry_file().path, PathBuf::from("/p/src/app.js"));
}

#[tokio::test]
async fn test_load_dependency_through_ancestor_walk() {
    let fs = workspace();
    let loader = loader(&fs);
    let app = loader.load_entry_package(Path::new("app")).await.unwrap();

    assert!(!loader.has_cached_package("lib"));
    assert!(matches!(
        loader.get_cached_package("lib"),
        Err(PackageError::NotLoaded { .. })
    ));

    let lib = loader.load_package(&app.dependency("lib").unwrap()).await.unwrap();
    assert_eq!(lib.directory(), Path::new("/ws/node_modules/lib"));
    assert_eq!(lib.entry_file().path, PathBuf::from("/ws/node_modules/lib/dist/lib.js"));
    assert!(!lib.is_entry_point());

    assert!(loader.has_cached_package("lib"));
    assert!(Arc::ptr_eq(&loader.get_cached_package("lib").unwrap(), &lib));
    assert_eq!(
        loader.cached_directory("lib"),
        Some(PathBuf::from("/ws/node_modules/lib"))
    );
    assert_eq!(loader.pending_loads(), 0);
}

#[tokio::test]
async fn test_concurrent_loads_share_one_walk() {
    let fs = workspace();
    let loader = loader(&fs);
    let app = loader.load_entry_package(Path::new("app")).await.unwrap();
    let dependency = app.dependency("lib").unwrap();
    let before = fs.op_counts();

    let (first, second) = futures::join!(
        loader.load_package(&dependency),
        loader.load_package(&dependency)
    );
    let (first, second) = (first.unwrap(), second.unwrap());
    assert!(Arc::ptr_eq(&first, &second));

    let after = fs.op_counts();
    assert_eq!(after.read_directory - before.read_directory, 1);
    assert_eq!(after.resolve_symlink - before.resolve_symlink, 1);
    assert_eq!(after.read - before.read, 1);
    assert_eq!(loader.pending_loads(), 0);

    let third = loader.load_package(&dependency).await.unwrap();
    assert!(Arc::ptr_eq(&first, &third));
    assert_eq!(fs.op_counts(), after);
}

#[tokio::test]
async fn test_top_level_vendor_shortcut() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.add_file(
        "/ws/node_modules_equiv/a/manifest.json",
        r#"{"name": "a", "dependencies": {"lib": "1"}}"#,
    )
    .add_file("/ws/node_modules_equiv/a/index.js", "")
    .add_file("/ws/node_modules_equiv/lib/manifest.json", r#"{"name": "lib"}"#)
    .add_file("/ws/node_modules_equiv/lib/index.js", "");
    let config = ResolverConfig {
        manifest_name: "manifest.json".to_string(),
        vendor_dir: "node_modules_equiv".to_string(),
        ..ResolverConfig::default()
    };
    let loader = PackageLoader::new(fs.clone() as Arc<dyn FileSystem>, config, "/ws");

    let a = loader
        .load_entry_package(Path::new("/ws/node_modules_equiv/a/index.js"))
        .await
        .unwrap();
    let dependency = a.dependency("lib").unwrap();
    let before = fs.op_counts();

    let directory = loader.resolve_directory(&dependency).await.unwrap();
    assert_eq!(directory, PathBuf::from("/ws/node_modules_equiv/lib"));
    // One stat: the upward walk never ran.
    assert_eq!(fs.op_counts().stat - before.stat, 1);
}

#[tokio::test]
async fn test_symlinked_dependency_is_canonicalized() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.add_file("/ws/app/package.json", r#"{"dependencies": {"shared": "1"}}"#)
        .add_file("/ws/app/index.js", "")
        .add_file("/ws/packages/shared/package.json", r#"{"name": "shared"}"#)
        .add_file("/ws/packages/shared/app.js", "")
        .add_symlink("/ws/app/node_modules/shared", "../../packages/shared");
    let loader = loader(&fs);
    let app = loader.load_entry_package(Path::new("/ws/app")).await.unwrap();

    let shared = loader
        .load_package(&app.dependency("shared").unwrap())
        .await
        .unwrap();
    assert_eq!(shared.directory(), Path::new("/ws/packages/shared"));
    assert_eq!(
        shared.entry_file().path,
        PathBuf::from("/ws/packages/shared/app.js")
    );
}

#[tokio::test]
async fn test_unresolvable_dependency_is_not_cached() {
    let fs = workspace();
    let loader = loader(&fs);
    let app = loader.load_entry_package(Path::new("app")).await.unwrap();

    let result = loader.load_package(&app.dependency("missing").unwrap()).await;
    assert!(matches!(
        result,
        Err(PackageError::DependencyNotFound { ref name, .. }) if name == "missing"
    ));
    assert!(!loader.has_cached_package("missing"));
    assert_eq!(loader.pending_loads(), 0);
}

#[tokio::test]
async fn test_package_without_entry_fails() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.add_file("/p/package.json", "{}")
        .add_file("/p/readme.md", "")
        .add_file("/p/node_modules/x/index.js", "");
    let loader = loader(&fs);

    let result = loader.load_entry_package(Path::new("/p")).await;
    assert!(matches!(result, Err(PackageError::NoEntryFile { .. })));
}

#[tokio::test]
async fn test_clear_drops_everything() {
    let fs = workspace();
    let loader = loader(&fs);
    let app = loader.load_entry_package(Path::new("app")).await.unwrap();
    loader.load_package(&app.dependency("lib").unwrap()).await.unwrap();
    assert_eq!(loader.packages().len(), 2);

    loader.clear();
    assert!(loader.packages().is_empty());
    assert!(!loader.has_cached_package("lib"));
}
