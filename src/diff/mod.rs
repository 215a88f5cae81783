//! Diff engine - join two scanned trees into a classified diff

mod compare;
mod engine;

pub use compare::compare_records;
pub use engine::{diff, diff_roots};

use crate::hash::HashAlgorithm;
use crate::types::FileRecord;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// The one classification every compared path receives
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Classification {
    /// Only in the source
    New,
    /// In both, content differs
    Modified,
    /// In both, content identical
    Unchanged,
    /// Only in the destination
    Orphaned,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::New => "new",
            Classification::Modified => "modified",
            Classification::Unchanged => "unchanged",
            Classification::Orphaned => "orphaned",
        }
    }
}

/// Comparison knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffOptions {
    /// Hash every equal-size pair, even when mtimes match
    pub hash_always: bool,
    pub algorithm: HashAlgorithm,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            hash_always: true,
            algorithm: HashAlgorithm::default(),
        }
    }
}

/// One classified path
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffEntry {
    pub relative_path: PathBuf,
    pub classification: Classification,
    /// Absent for Orphaned
    pub source: Option<FileRecord>,
    /// Absent for New
    pub dest: Option<FileRecord>,
}

impl DiffEntry {
    /// Size of the side that would be copied
    pub fn transfer_size(&self) -> u64 {
        self.source.as_ref().map(|r| r.size).unwrap_or(0)
    }
}

/// A path whose classification could not be determined
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnreadableEntry {
    pub relative_path: PathBuf,
    pub reason: String,
}

/// Result of joining a source tree against a destination tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diff {
    pub source_root: PathBuf,
    pub dest_root: PathBuf,
    /// Sorted by relative path, one entry per path
    pub entries: Vec<DiffEntry>,
    /// Indeterminate paths; never present in `entries`
    pub unreadable: Vec<UnreadableEntry>,
    /// Directories only the source has
    pub source_only_dirs: BTreeSet<PathBuf>,
    /// Directories only the destination has
    pub dest_only_dirs: BTreeSet<PathBuf>,
}

impl Diff {
    pub fn with_class(&self, class: Classification) -> impl Iterator<Item = &DiffEntry> {
        self.entries
            .iter()
            .filter(move |e| e.classification == class)
    }

    pub fn count(&self, class: Classification) -> usize {
        self.with_class(class).count()
    }

    /// True when applying the diff would change nothing and every path
    /// could be classified
    pub fn is_clean(&self) -> bool {
        self.unreadable.is_empty()
            && self
                .entries
                .iter()
                .all(|e| e.classification == Classification::Unchanged)
    }
}
