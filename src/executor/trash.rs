//! Trash-based delete and preserve operations
//!
//! Deleted or overwritten files are moved under `.hashmirror_trash/<stamp>/`
//! with original relative paths preserved. One manifest per snapshot is
//! written after the batch completes.

use super::copy::{copy_file_atomic, create_symlink};
use crate::types::MirrorError;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

/// Name of the trash directory kept at each root
pub const TRASH_DIR: &str = ".hashmirror_trash";

pub const MANIFEST_FILE: &str = "MANIFEST.json";

/// Represents a single trashed file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrashedFile {
    /// Relative path from the root (original location)
    pub original_path: String,
    /// Relative path inside the snapshot directory
    pub trash_path: String,
    /// ISO 8601 timestamp of the run
    pub trashed_at: String,
    /// File size in bytes
    pub size: u64,
}

/// Manifest file that tracks all files in a trash snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrashManifest {
    /// Why files landed here: "delete" or "restore-backup"
    pub reason: String,
    pub files: Vec<TrashedFile>,
}

/// One trash snapshot, shared by every worker of a run
#[derive(Debug, Clone)]
pub struct Trash {
    stamp: String,
    started_at: String,
}

impl Trash {
    /// Snapshot named after the current local time
    pub fn now() -> Self {
        let now = Local::now();
        Self {
            stamp: now.format("%Y-%m-%d_%H%M%S").to_string(),
            started_at: now.to_rfc3339(),
        }
    }

    pub fn stamp(&self) -> &str {
        &self.stamp
    }

    /// `<root>/.hashmirror_trash/<stamp>`
    pub fn snapshot_dir(&self, root: &Path) -> PathBuf {
        root.join(TRASH_DIR).join(&self.stamp)
    }

    /// Move `root/relative` into the snapshot
    ///
    /// The original is never removed unless its copy in the trash exists.
    /// Returns the size of the moved entry.
    pub fn move_to_trash(&self, root: &Path, relative: &Path) -> io::Result<u64> {
        let target_path = root.join(relative);
        let trash_file_path = self.prepare_slot(root, relative)?;

        let metadata = fs::symlink_metadata(&target_path)?;
        let size = metadata.len();

        match fs::rename(&target_path, &trash_file_path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::CrossesDevices => {
                if metadata.file_type().is_symlink() {
                    let link_target = fs::read_link(&target_path)?;
                    create_symlink(&link_target, &trash_file_path)?;
                } else {
                    copy_file_atomic(&target_path, &trash_file_path)?;
                }
                fs::remove_file(&target_path)?;
            }
            Err(e) => return Err(e),
        }

        Ok(size)
    }

    /// Copy `root/relative` into the snapshot, leaving the original in place
    ///
    /// Returns `false` when there was nothing to preserve.
    pub fn copy_to_trash(&self, root: &Path, relative: &Path) -> io::Result<bool> {
        let target_path = root.join(relative);
        let metadata = match fs::symlink_metadata(&target_path) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e),
        };
        if metadata.is_dir() {
            return Ok(false);
        }

        let trash_file_path = self.prepare_slot(root, relative)?;
        if metadata.file_type().is_symlink() {
            create_symlink(&fs::read_link(&target_path)?, &trash_file_path)?;
        } else {
            copy_file_atomic(&target_path, &trash_file_path)?;
        }
        Ok(true)
    }

    /// Write the snapshot manifest once, after the batch has finished
    pub fn write_manifest(
        &self,
        root: &Path,
        reason: &str,
        entries: &[(PathBuf, u64)],
    ) -> Result<(), MirrorError> {
        if entries.is_empty() {
            return Ok(());
        }

        let snapshot = self.snapshot_dir(root);
        fs::create_dir_all(&snapshot).map_err(|e| MirrorError::from_io(&snapshot, e))?;

        let manifest = TrashManifest {
            reason: reason.to_string(),
            files: entries
                .iter()
                .map(|(path, size)| TrashedFile {
                    original_path: path.to_string_lossy().to_string(),
                    trash_path: path.to_string_lossy().to_string(),
                    trashed_at: self.started_at.clone(),
                    size: *size,
                })
                .collect(),
        };

        let manifest_json = serde_json::to_string_pretty(&manifest).map_err(|e| {
            MirrorError::Validation(format!("Failed to serialize {}: {}", MANIFEST_FILE, e))
        })?;
        let manifest_path = snapshot.join(MANIFEST_FILE);
        fs::write(&manifest_path, manifest_json)
            .map_err(|e| MirrorError::from_io(&manifest_path, e))
    }

    fn prepare_slot(&self, root: &Path, relative: &Path) -> io::Result<PathBuf> {
        let slot = self.snapshot_dir(root).join(relative);
        if let Some(parent) = slot.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(slot)
    }
}

/// Read a snapshot manifest back
pub fn read_manifest(snapshot_dir: &Path) -> Result<TrashManifest, MirrorError> {
    let path = snapshot_dir.join(MANIFEST_FILE);
    let content = fs::read_to_string(&path).map_err(|e| MirrorError::from_io(&path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| MirrorError::Validation(format!("Failed to parse {}: {}", MANIFEST_FILE, e)))
}
