//! Restorer - bring missing or outdated files back from the backup

use crate::diff::{Classification, Diff};
use crate::plan::{depth, ActionPlan, Direction, HeldBack};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which differing files a restore brings back
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum RestoreMode {
    /// Only files missing from the source
    Missing,

    /// Missing files, and differing files whose source copy is not newer than the backup
    #[default]
    Outdated,

    /// Missing files and every differing file
    Force,
}

/// Build a restore plan from a diff whose source is the backup and whose
/// destination is the original source
///
/// Only New (missing in source) and, depending on `mode`, Modified entries
/// are restored. Source-only files are left alone; nothing is ever deleted.
pub fn restore_plan(reversed: Diff, mode: RestoreMode) -> ActionPlan {
    let mut copy_set = Vec::new();
    let mut held_back = Vec::new();
    let mut unchanged = 0usize;

    for entry in reversed.entries {
        match entry.classification {
            Classification::New => copy_set.push(entry),
            Classification::Modified => match hold_back_reason(&entry, mode) {
                Some(reason) => held_back.push(HeldBack {
                    relative_path: entry.relative_path,
                    reason: reason.to_string(),
                }),
                None => copy_set.push(entry),
            },
            Classification::Unchanged => unchanged += 1,
            Classification::Orphaned => {}
        }
    }

    let mut directories: Vec<PathBuf> = reversed.source_only_dirs.into_iter().collect();
    directories.sort_by(|a, b| depth(a).cmp(&depth(b)).then_with(|| a.cmp(b)));

    ActionPlan {
        direction: Direction::Restore,
        from_root: reversed.source_root,
        to_root: reversed.dest_root,
        copy_set,
        delete_set: Vec::new(),
        directories,
        unchanged,
        unreadable: reversed.unreadable,
        held_back,
    }
}

fn hold_back_reason(entry: &crate::diff::DiffEntry, mode: RestoreMode) -> Option<&'static str> {
    match mode {
        RestoreMode::Force => None,
        RestoreMode::Missing => Some("present in source (restore mode: missing)"),
        RestoreMode::Outdated => {
            // `source` here is the backup, `dest` the live file
            let backup = entry.source.as_ref()?;
            let live = entry.dest.as_ref()?;
            if live.modification_time > backup.modification_time {
                Some("source is newer than backup")
            } else {
                None
            }
        }
    }
}
