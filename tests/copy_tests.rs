//! Tests for atomic file copy operations

use hashmirror::executor::copy::part_path_for;
use hashmirror::executor::{copy_file_atomic, FileSystem, LocalFs, PART_SUFFIX};
use hashmirror::types::DeleteMethod;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

fn create_test_file(path: &Path, content: &[u8]) {
    let mut file = fs::File::create(path).expect("Failed to create test file");
    file.write_all(content).expect("Failed to write test content");
    file.flush().expect("Failed to flush");
}

fn set_file_mtime(path: &PathBuf, mtime: SystemTime) {
    let filetime_mtime = filetime::FileTime::from_system_time(mtime);
    filetime::set_file_mtime(path, filetime_mtime).expect("Failed to set mtime");
}

#[test]
fn test_copy_basic_content() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = temp_dir.path();

    let src_path = root.join("source.txt");
    let content = b"Hello, hashmirror! This is a test file.";
    create_test_file(&src_path, content);

    let dest_path = root.join("dest.txt");
    let bytes_copied = copy_file_atomic(&src_path, &dest_path).expect("copy should succeed");

    assert_eq!(bytes_copied, content.len() as u64);
    assert_eq!(fs::read(&dest_path).expect("read dest"), content);
}

#[test]
fn test_copy_creates_directories() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let src_path = temp_dir.path().join("source.txt");
    create_test_file(&src_path, b"nested");

    let dest_path = temp_dir.path().join("a/b/c/dest.txt");
    copy_file_atomic(&src_path, &dest_path).expect("copy into missing dirs");

    assert_eq!(fs::read(&dest_path).unwrap(), b"nested");
}

#[test]
fn test_copy_preserves_mtime() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let src_path = temp_dir.path().join("source.txt");
    create_test_file(&src_path, b"timed");
    let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
    set_file_mtime(&src_path, mtime);

    let dest_path = temp_dir.path().join("dest.txt");
    copy_file_atomic(&src_path, &dest_path).expect("copy should succeed");

    let dest_mtime = fs::metadata(&dest_path).unwrap().modified().unwrap();
    let drift = dest_mtime
        .duration_since(mtime)
        .unwrap_or_else(|e| e.duration());
    assert!(drift < Duration::from_secs(1), "mtime drifted by {drift:?}");
}

#[test]
fn test_copy_removes_part_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let src_path = temp_dir.path().join("source.txt");
    create_test_file(&src_path, b"content");

    let dest_path = temp_dir.path().join("dest.txt");
    copy_file_atomic(&src_path, &dest_path).expect("copy should succeed");

    assert!(!part_path_for(&dest_path).exists());
    let leftovers: Vec<_> = fs::read_dir(temp_dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().ends_with(PART_SUFFIX))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_overwrite_is_all_or_nothing() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let dest_path = temp_dir.path().join("dest.txt");
    create_test_file(&dest_path, b"previous content");

    let result = copy_file_atomic(&temp_dir.path().join("vanished.txt"), &dest_path);

    assert!(result.is_err());
    assert_eq!(fs::read(&dest_path).unwrap(), b"previous content");
    assert!(!part_path_for(&dest_path).exists());
}

#[test]
fn test_copy_large_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let src_path = temp_dir.path().join("large.bin");
    let content: Vec<u8> = (0..3 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
    create_test_file(&src_path, &content);

    let dest_path = temp_dir.path().join("large_copy.bin");
    let bytes = copy_file_atomic(&src_path, &dest_path).expect("copy should succeed");

    assert_eq!(bytes, content.len() as u64);
    assert_eq!(fs::read(&dest_path).unwrap(), content);
}

#[cfg(unix)]
#[test]
fn test_copy_preserves_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let src_path = temp_dir.path().join("script.sh");
    create_test_file(&src_path, b"#!/bin/sh\n");
    fs::set_permissions(&src_path, fs::Permissions::from_mode(0o750)).unwrap();

    let dest_path = temp_dir.path().join("copy.sh");
    copy_file_atomic(&src_path, &dest_path).expect("copy should succeed");

    let mode = fs::metadata(&dest_path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o750);
}

#[cfg(unix)]
#[test]
fn test_symlink_is_copied_as_link() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let fs_impl = LocalFs::new(DeleteMethod::Trash);
    let link = temp_dir.path().join("out/link");

    fs_impl
        .copy_symlink(Path::new("../target.txt"), &link)
        .expect("symlink copy");

    assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("../target.txt"));
}
