//! Filesystem capability used by every mutating action

use super::copy::{copy_file_atomic, copy_symlink};
use super::trash::Trash;
use crate::types::{DeleteMethod, MirrorError};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

/// Why files were put in the trash during a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrashReason {
    Deleted,
    /// Kept before being overwritten by a restore
    Preserved,
}

impl TrashReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrashReason::Deleted => "delete",
            TrashReason::Preserved => "restore-backup",
        }
    }
}

/// Every filesystem mutation the executor performs goes through this trait.
///
/// Implementations must be callable from many worker threads at once; each
/// call touches a single path owned by the calling worker.
pub trait FileSystem: Send + Sync {
    /// Atomically replace `to` with the contents of `from`. Returns bytes written.
    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<u64>;

    /// Create (or replace) a symlink at `to` pointing at `target`
    fn copy_symlink(&self, target: &Path, to: &Path) -> io::Result<()>;

    /// Delete `root/relative`. An already missing file counts as deleted.
    fn delete_file(&self, root: &Path, relative: &Path) -> io::Result<()>;

    fn create_dir(&self, path: &Path) -> io::Result<()>;

    /// Remove `path` if it is empty. Returns `false` when it still has children.
    fn remove_empty_dir(&self, path: &Path) -> io::Result<bool>;

    /// Keep a copy of `root/relative` in the trash before it is overwritten.
    /// Returns `false` when there was nothing to keep.
    fn preserve_file(&self, root: &Path, relative: &Path) -> io::Result<bool>;

    /// Called once after a batch with the `(relative path, size)` of every file
    /// the batch moved into `root`'s trash. Nothing to do by default.
    fn record_trashed(
        &self,
        _root: &Path,
        _reason: TrashReason,
        _entries: &[(PathBuf, u64)],
    ) -> Result<(), MirrorError> {
        Ok(())
    }
}

/// The real filesystem
#[derive(Debug, Clone)]
pub struct LocalFs {
    delete_method: DeleteMethod,
    trash: Trash,
}

impl LocalFs {
    pub fn new(delete_method: DeleteMethod) -> Self {
        Self {
            delete_method,
            trash: Trash::now(),
        }
    }

    /// The snapshot deletes and preserved files land in
    pub fn trash(&self) -> &Trash {
        &self.trash
    }
}

impl FileSystem for LocalFs {
    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<u64> {
        copy_file_atomic(from, to)
    }

    fn copy_symlink(&self, target: &Path, to: &Path) -> io::Result<()> {
        copy_symlink(target, to)
    }

    fn delete_file(&self, root: &Path, relative: &Path) -> io::Result<()> {
        let path = root.join(relative);
        let result = match self.delete_method {
            DeleteMethod::Trash => self.trash.move_to_trash(root, relative).map(|_| ()),
            DeleteMethod::Permanent => fs::remove_file(&path),
        };

        match result {
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn remove_empty_dir(&self, path: &Path) -> io::Result<bool> {
        match fs::remove_dir(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
            Err(e) if e.kind() == ErrorKind::DirectoryNotEmpty => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn preserve_file(&self, root: &Path, relative: &Path) -> io::Result<bool> {
        self.trash.copy_to_trash(root, relative)
    }

    fn record_trashed(
        &self,
        root: &Path,
        reason: TrashReason,
        entries: &[(PathBuf, u64)],
    ) -> Result<(), MirrorError> {
        if reason == TrashReason::Deleted && self.delete_method == DeleteMethod::Permanent {
            return Ok(());
        }
        self.trash.write_manifest(root, reason.as_str(), entries)
    }
}
