//! Tests for the disk adapter

use evalgraph_fs::{DiskFileSystem, Encoding, FileSystem, TraversalFilter};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_recursive_listing_honours_filter() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("src/lib")).unwrap();
    fs::create_dir_all(root.join(".git")).unwrap();
    fs::create_dir_all(root.join("node_modules/dep")).unwrap();
    fs::write(root.join("package.json"), "{}").unwrap();
    fs::write(root.join("src/lib/util.js"), "").unwrap();
    fs::write(root.join(".git/HEAD"), "").unwrap();
    fs::write(root.join("node_modules/dep/index.js"), "").unwrap();

    let disk = DiskFileSystem::new();
    let files = disk
        .read_directory_sync(root, &TraversalFilter::new("node_modules"))
        .unwrap();

    assert_eq!(
        files,
        vec![root.join("package.json"), root.join("src/lib/util.js")]
    );
}

#[test]
fn test_missing_path_is_not_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let disk = DiskFileSystem::new();
    assert_eq!(disk.stat_sync(&temp_dir.path().join("absent")).unwrap(), None);
}

#[tokio::test]
async fn test_write_creates_parents_and_reads_back() {
    let temp_dir = TempDir::new().unwrap();
    let disk = DiskFileSystem::new();
    let target = temp_dir.path().join("out/nested/file.js");

    disk.write(&target, "export default 1;").await.unwrap();
    let text = disk.read(&target, Encoding::Utf8).await.unwrap();
    assert_eq!(text, "export default 1;");

    disk.remove(&temp_dir.path().join("out")).await.unwrap();
    assert!(!target.exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_resolve_symlink_canonicalizes() {
    let temp_dir = TempDir::new().unwrap();
    let real = temp_dir.path().join("store/lib");
    fs::create_dir_all(&real).unwrap();
    fs::write(real.join("package.json"), "{}").unwrap();
    fs::create_dir_all(temp_dir.path().join("node_modules")).unwrap();
    std::os::unix::fs::symlink(&real, temp_dir.path().join("node_modules/lib")).unwrap();

    let disk = DiskFileSystem::new();
    let resolved = disk
        .resolve_symlink(&temp_dir.path().join("node_modules/lib/package.json"))
        .await
        .unwrap();
    assert_eq!(resolved, real.join("package.json").canonicalize().unwrap());
}
