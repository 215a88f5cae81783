//! Planned filesystem actions and the policies that govern them

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Reportable action category of an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Copy,
    Delete,
    Restore,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Copy => "Copy",
            ActionKind::Delete => "Delete",
            ActionKind::Restore => "Restore",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the safety gate treats destructive batches
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum DeletionPolicy {
    /// Ask the confirmation collaborator once per batch
    #[default]
    AlwaysConfirm,

    /// Never delete anything
    NeverDelete,

    /// Proceed without asking
    AutoConfirm,
}

/// What deleting a destination file means
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum DeleteMethod {
    /// Move to .hashmirror_trash/<stamp>/
    #[default]
    Trash,

    /// Permanent deletion
    Permanent,
}

/// A single filesystem effect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOp {
    /// Copy a regular file; `preserve_root` keeps the overwritten file in that root's trash
    CopyFile {
        from: PathBuf,
        to: PathBuf,
        preserve_root: Option<PathBuf>,
    },

    /// Recreate a symlink without dereferencing it
    CopySymlink { target: PathBuf, to: PathBuf },

    /// Delete `root/relative_path`
    DeleteFile { root: PathBuf },

    CreateDir { path: PathBuf },

    /// Remove a directory only if it is empty
    RemoveDir { path: PathBuf },
}

/// One unit of work for the executor, keyed by relative path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAction {
    pub relative_path: PathBuf,
    pub kind: ActionKind,
    pub op: FileOp,
    /// Size estimate used for progress reporting
    pub expected_bytes: u64,
}

impl PlannedAction {
    pub fn new(relative_path: PathBuf, kind: ActionKind, op: FileOp, expected_bytes: u64) -> Self {
        Self {
            relative_path,
            kind,
            op,
            expected_bytes,
        }
    }

    pub fn action_name(&self) -> &'static str {
        self.kind.as_str()
    }

    /// Directory creation or pruning rather than a file operation
    pub fn is_directory(&self) -> bool {
        matches!(self.op, FileOp::CreateDir { .. } | FileOp::RemoveDir { .. })
    }

    pub fn is_transfer(&self) -> bool {
        matches!(
            self.op,
            FileOp::CopyFile { .. } | FileOp::CopySymlink { .. }
        )
    }
}
