//! Sequential directory walker

use super::Exclusions;
use crate::executor::{PART_SUFFIX, TRASH_DIR};
use crate::types::{FileRecord, FileTree, MirrorError};
use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};

/// Per-directory ignore file, read with gitignore syntax
pub const IGNORE_FILE_NAME: &str = ".hashmirrorignore";

/// Callback for reporting scan progress
///
/// Arguments:
/// - `files_scanned`: Total number of files scanned so far
/// - `bytes_scanned`: Total bytes scanned so far
pub type ProgressCallback<'a> = dyn Fn(u64, u64) + Send + Sync + 'a;

/// Scan a directory and build a FileTree
///
/// Uses the `ignore` crate for traversal. Symlinks are recorded, never followed.
/// Hidden files are included; the only ignore files honoured are `.hashmirrorignore`.
///
/// # Errors
/// * `MirrorError::Config` if `root_path` is not a directory
///
/// Everything else is fail-soft: entries that vanish mid-scan are dropped, and
/// entries that cannot be read are recorded in [`FileTree::unreadable`].
pub fn scan_tree(
    root_path: &Path,
    exclusions: &Exclusions,
    on_progress: Option<&ProgressCallback<'_>>,
) -> Result<FileTree, MirrorError> {
    if !root_path.is_dir() {
        return Err(MirrorError::Config(format!(
            "{} is not a directory",
            root_path.display()
        )));
    }

    let start_time = Instant::now();
    let mut tree = FileTree::new(root_path.to_path_buf());

    let mut scanned_count: u64 = 0;
    let mut scanned_bytes: u64 = 0;

    let filter_root = root_path.to_path_buf();
    let filter_exclusions = exclusions.clone();
    let walker = ignore::WalkBuilder::new(root_path)
        .standard_filters(false)
        .hidden(false)
        .follow_links(false)
        .add_custom_ignore_filename(IGNORE_FILE_NAME)
        .filter_entry(move |entry| match entry.path().strip_prefix(&filter_root) {
            Ok(relative) if !relative.as_os_str().is_empty() => {
                !is_internal(relative) && !filter_exclusions.is_excluded(relative)
            }
            _ => true,
        })
        .build();

    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                let path = error_path(&e).map(|p| relative_to(root_path, &p));
                if is_not_found(&e) {
                    debug!(error = %e, "entry vanished during scan");
                    continue;
                }
                warn!(error = %e, "error during directory traversal; continuing");
                if let Some(path) = path {
                    tree.mark_unreadable(path, e.to_string());
                }
                continue;
            }
        };

        if entry.depth() == 0 {
            continue;
        }

        let relative_path = relative_to(root_path, entry.path());

        let Some(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            tree.insert_dir(relative_path);
            continue;
        }

        if !file_type.is_file() && !file_type.is_symlink() {
            debug!(path = %relative_path.display(), "skipping special file");
            continue;
        }

        let metadata = match std::fs::symlink_metadata(entry.path()) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %relative_path.display(), "file vanished during scan");
                continue;
            }
            Err(e) => {
                warn!(path = %relative_path.display(), error = %e, "failed to read metadata");
                tree.mark_unreadable(relative_path, e.to_string());
                continue;
            }
        };

        match build_record(entry.path(), relative_path.clone(), &metadata) {
            Ok(record) => {
                scanned_count += 1;
                scanned_bytes += record.size;
                tree.insert(record);

                if let Some(callback) = on_progress {
                    callback(scanned_count, scanned_bytes);
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %relative_path.display(), "file vanished during scan");
            }
            Err(e) => {
                warn!(path = %relative_path.display(), error = %e, "skipping unreadable entry");
                tree.mark_unreadable(relative_path, e.to_string());
            }
        }
    }

    tree.set_scan_duration(start_time.elapsed());
    debug!(
        root = %root_path.display(),
        files = tree.total_files,
        dirs = tree.dirs.len(),
        bytes = tree.total_size,
        elapsed_ms = tree.scan_duration.as_millis() as u64,
        "scan complete"
    );

    Ok(tree)
}

fn build_record(
    path: &Path,
    relative_path: PathBuf,
    metadata: &Metadata,
) -> std::io::Result<FileRecord> {
    let mtime = metadata.modified()?;

    if metadata.file_type().is_symlink() {
        let target = std::fs::read_link(path)?;
        Ok(FileRecord::new_symlink(
            relative_path,
            metadata.len(),
            mtime,
            target,
        ))
    } else {
        Ok(FileRecord::new(relative_path, metadata.len(), mtime))
    }
}

/// Paths the engine itself owns: the trash root and interrupted copy leftovers
fn is_internal(relative: &Path) -> bool {
    if relative == Path::new(TRASH_DIR) {
        return true;
    }
    relative
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(PART_SUFFIX))
}

fn relative_to(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

fn error_path(error: &ignore::Error) -> Option<PathBuf> {
    match error {
        ignore::Error::WithPath { path, .. } => Some(path.clone()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        _ => None,
    }
}

fn is_not_found(error: &ignore::Error) -> bool {
    error
        .io_error()
        .is_some_and(|e| e.kind() == ErrorKind::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &[u8]) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_scan_empty_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let tree = scan_tree(temp_dir.path(), &Exclusions::none(), None)
            .expect("scan should succeed on empty dir");

        assert!(tree.is_empty());
        assert_eq!(tree.total_size, 0);
        assert_eq!(tree.root_path, temp_dir.path());
    }

    #[test]
    fn test_scan_missing_root_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = scan_tree(&temp_dir.path().join("absent"), &Exclusions::none(), None);
        assert!(matches!(result, Err(MirrorError::Config(_))));
    }

    #[test]
    fn test_scan_records_files_and_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "a.txt", b"Hello, World!");
        write(root, "nested/deep/b.txt", b"xy");
        fs::create_dir(root.join("empty")).unwrap();

        let tree = scan_tree(root, &Exclusions::none(), None).unwrap();

        assert_eq!(tree.total_files, 2);
        assert_eq!(tree.total_size, 15);
        assert!(tree.contains(Path::new("nested/deep/b.txt")));
        assert!(tree.contains_dir(Path::new("nested")));
        assert!(tree.contains_dir(Path::new("nested/deep")));
        assert!(tree.contains_dir(Path::new("empty")));
    }

    #[test]
    fn test_scan_includes_hidden_files() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), ".env", b"KEY=1");

        let tree = scan_tree(temp_dir.path(), &Exclusions::none(), None).unwrap();
        assert!(tree.contains(Path::new(".env")));
    }

    #[test]
    fn test_scan_applies_exclusions() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "build/out.o", b"obj");
        write(root, "buildx/keep.txt", b"keep");
        write(root, "notes.tmp", b"tmp");

        let exclusions = Exclusions::new(&["build".to_string(), "*.tmp".to_string()]).unwrap();
        let tree = scan_tree(root, &exclusions, None).unwrap();

        assert!(!tree.contains(Path::new("build/out.o")));
        assert!(!tree.contains_dir(Path::new("build")));
        assert!(!tree.contains(Path::new("notes.tmp")));
        assert!(tree.contains(Path::new("buildx/keep.txt")));
    }

    #[test]
    fn test_scan_honours_ignore_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, IGNORE_FILE_NAME, b"*.log\n");
        write(root, "app.log", b"log");
        write(root, "app.rs", b"fn main() {}");

        let tree = scan_tree(root, &Exclusions::none(), None).unwrap();
        assert!(!tree.contains(Path::new("app.log")));
        assert!(tree.contains(Path::new("app.rs")));
    }

    #[test]
    fn test_scan_skips_trash_and_part_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, &format!("{}/stamp/old.txt", TRASH_DIR), b"old");
        write(root, &format!("copy.bin{}", PART_SUFFIX), b"partial");
        write(root, "real.txt", b"real");

        let tree = scan_tree(root, &Exclusions::none(), None).unwrap();
        assert_eq!(tree.len(), 1);
        assert!(tree.contains(Path::new("real.txt")));
        assert!(!tree.contains_dir(Path::new(TRASH_DIR)));
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_records_symlink_without_following() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "target_dir/file.txt", b"content");
        std::os::unix::fs::symlink("target_dir", root.join("link")).unwrap();

        let tree = scan_tree(root, &Exclusions::none(), None).unwrap();
        let link = tree.get(Path::new("link")).expect("symlink recorded");

        assert_eq!(link.symlink_target(), Some(&PathBuf::from("target_dir")));
        assert!(!tree.contains(Path::new("link/file.txt")));
    }

    #[test]
    fn test_progress_callback_counts_files() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "one.txt", b"1");
        write(temp_dir.path(), "two.txt", b"22");

        let files = Arc::new(AtomicU64::new(0));
        let bytes = Arc::new(AtomicU64::new(0));
        let (f, b) = (files.clone(), bytes.clone());
        let callback: Box<ProgressCallback<'_>> = Box::new(move |count, total| {
            f.store(count, Ordering::SeqCst);
            b.store(total, Ordering::SeqCst);
        });

        scan_tree(temp_dir.path(), &Exclusions::none(), Some(callback.as_ref())).unwrap();

        assert_eq!(files.load(Ordering::SeqCst), 2);
        assert_eq!(bytes.load(Ordering::SeqCst), 3);
    }
}
