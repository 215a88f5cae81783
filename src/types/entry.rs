//! FileRecord - one file's observed state in one tree at scan time

use crate::hash::Digest;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;

/// What kind of filesystem entry a record describes.
///
/// Symlinks are never followed; they are compared by target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Symlink { target: PathBuf },
}

/// Represents a file in a scanned tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileRecord {
    /// Relative path from the tree root
    pub relative_path: PathBuf,

    /// File size in bytes
    pub size: u64,

    /// Last modification time
    pub modification_time: SystemTime,

    /// Content digest (computed lazily by the differ)
    pub content_hash: Option<Digest>,

    pub kind: EntryKind,
}

impl FileRecord {
    /// Create a record for a regular file
    pub fn new(relative_path: PathBuf, size: u64, modification_time: SystemTime) -> Self {
        Self {
            relative_path,
            size,
            modification_time,
            content_hash: None,
            kind: EntryKind::File,
        }
    }

    /// Create a record for a symlink
    pub fn new_symlink(
        relative_path: PathBuf,
        size: u64,
        modification_time: SystemTime,
        target: PathBuf,
    ) -> Self {
        Self {
            relative_path,
            size,
            modification_time,
            content_hash: None,
            kind: EntryKind::Symlink { target },
        }
    }

    /// Set the hash for this record
    pub fn with_hash(mut self, hash: Digest) -> Self {
        self.content_hash = Some(hash);
        self
    }

    pub fn has_hash(&self) -> bool {
        self.content_hash.is_some()
    }

    pub fn is_symlink(&self) -> bool {
        matches!(self.kind, EntryKind::Symlink { .. })
    }

    /// Link target, if this record is a symlink
    pub fn symlink_target(&self) -> Option<&PathBuf> {
        match &self.kind {
            EntryKind::Symlink { target } => Some(target),
            EntryKind::File => None,
        }
    }
}
