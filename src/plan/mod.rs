//! Reconciler - turn a classified diff into ordered action batches

mod gate;

pub use gate::{
    ConfirmationRequest, Confirmer, GatedOperation, SafetyGate, StaticConfirmer,
};

use crate::diff::{Classification, Diff, DiffEntry, UnreadableEntry};
use crate::types::{ActionKind, EntryKind, FileOp, OperationOutcome, PlannedAction};
use std::path::{Path, PathBuf};

/// Which way a plan moves data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Source → destination
    Mirror,
    /// Destination (backup) → source
    Restore,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanOptions {
    /// Remove destination-only directories left empty after deletes
    pub prune_empty_dirs: bool,
}

/// Ordered batches for one pair
///
/// `from_root`/`to_root` are the roots data flows between: for a restore plan
/// `from_root` is the backup and `to_root` the original source.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionPlan {
    pub direction: Direction,
    pub from_root: PathBuf,
    pub to_root: PathBuf,
    /// New ∪ Modified, by path
    pub copy_set: Vec<DiffEntry>,
    /// Orphaned, by path
    pub delete_set: Vec<DiffEntry>,
    /// Mirror: dirs to prune, deepest first. Restore: dirs to create, shallowest first.
    pub directories: Vec<PathBuf>,
    pub unchanged: usize,
    pub unreadable: Vec<UnreadableEntry>,
    /// Differing paths deliberately left alone (restore modes)
    pub held_back: Vec<HeldBack>,
}

/// A differing path the plan chose not to act on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeldBack {
    pub relative_path: PathBuf,
    pub reason: String,
}

/// Build the mirror plan for a diff
pub fn plan(diff: Diff, options: &PlanOptions) -> ActionPlan {
    let mut copy_set = Vec::new();
    let mut delete_set = Vec::new();
    let mut unchanged = 0usize;

    for entry in diff.entries {
        match entry.classification {
            Classification::New | Classification::Modified => copy_set.push(entry),
            Classification::Orphaned => delete_set.push(entry),
            Classification::Unchanged => unchanged += 1,
        }
    }

    let directories = if options.prune_empty_dirs {
        let mut dirs: Vec<PathBuf> = diff.dest_only_dirs.into_iter().collect();
        dirs.sort_by(|a, b| depth(b).cmp(&depth(a)).then_with(|| a.cmp(b)));
        dirs
    } else {
        Vec::new()
    };

    ActionPlan {
        direction: Direction::Mirror,
        from_root: diff.source_root,
        to_root: diff.dest_root,
        copy_set,
        delete_set,
        directories,
        unchanged,
        unreadable: diff.unreadable,
        held_back: Vec::new(),
    }
}

impl ActionPlan {
    fn transfer_kind(&self) -> ActionKind {
        match self.direction {
            Direction::Mirror => ActionKind::Copy,
            Direction::Restore => ActionKind::Restore,
        }
    }

    /// Bytes the copy set will move
    pub fn copy_bytes(&self) -> u64 {
        self.copy_set.iter().map(DiffEntry::transfer_size).sum()
    }

    /// Bytes the delete set would remove
    pub fn delete_bytes(&self) -> u64 {
        self.delete_set
            .iter()
            .filter_map(|e| e.dest.as_ref())
            .map(|r| r.size)
            .sum()
    }

    /// True when executing would touch nothing
    pub fn is_empty(&self) -> bool {
        self.copy_set.is_empty() && self.delete_set.is_empty() && self.directories.is_empty()
    }

    /// Copy (or restore) actions, one per entry
    ///
    /// With `preserve` set, files about to be overwritten are kept in the
    /// receiving root's trash first.
    pub fn copy_actions(&self, preserve: bool) -> Vec<PlannedAction> {
        let kind = self.transfer_kind();
        self.copy_set
            .iter()
            .filter_map(|entry| {
                let source = entry.source.as_ref()?;
                let to = self.to_root.join(&entry.relative_path);
                let op = match &source.kind {
                    EntryKind::Symlink { target } => FileOp::CopySymlink {
                        target: target.clone(),
                        to,
                    },
                    EntryKind::File => FileOp::CopyFile {
                        from: self.from_root.join(&entry.relative_path),
                        to,
                        preserve_root: (preserve && entry.dest.is_some())
                            .then(|| self.to_root.clone()),
                    },
                };
                Some(PlannedAction::new(
                    entry.relative_path.clone(),
                    kind,
                    op,
                    source.size,
                ))
            })
            .collect()
    }

    pub fn delete_actions(&self) -> Vec<PlannedAction> {
        self.delete_set
            .iter()
            .map(|entry| {
                PlannedAction::new(
                    entry.relative_path.clone(),
                    ActionKind::Delete,
                    FileOp::DeleteFile {
                        root: self.to_root.clone(),
                    },
                    entry.dest.as_ref().map(|r| r.size).unwrap_or(0),
                )
            })
            .collect()
    }

    /// Directory actions grouped into batches that must run in order
    ///
    /// Mirror: one batch per depth, deepest first, so a parent is only tried
    /// after its children are gone. Restore: a single creation batch.
    pub fn directory_batches(&self) -> Vec<Vec<PlannedAction>> {
        match self.direction {
            Direction::Restore => {
                if self.directories.is_empty() {
                    return Vec::new();
                }
                vec![self
                    .directories
                    .iter()
                    .map(|dir| {
                        PlannedAction::new(
                            dir.clone(),
                            ActionKind::Restore,
                            FileOp::CreateDir {
                                path: self.to_root.join(dir),
                            },
                            0,
                        )
                    })
                    .collect()]
            }
            Direction::Mirror => {
                let mut batches: Vec<Vec<PlannedAction>> = Vec::new();
                let mut current_depth = None;
                for dir in &self.directories {
                    let action = PlannedAction::new(
                        dir.clone(),
                        ActionKind::Delete,
                        FileOp::RemoveDir {
                            path: self.to_root.join(dir),
                        },
                        0,
                    );
                    if current_depth == Some(depth(dir)) {
                        if let Some(batch) = batches.last_mut() {
                            batch.push(action);
                            continue;
                        }
                    }
                    current_depth = Some(depth(dir));
                    batches.push(vec![action]);
                }
                batches
            }
        }
    }

    /// Outcomes for paths that could not be classified
    pub fn unreadable_outcomes(&self) -> Vec<OperationOutcome> {
        let kind = self.transfer_kind();
        self.unreadable
            .iter()
            .map(|u| {
                OperationOutcome::skipped(
                    u.relative_path.clone(),
                    kind,
                    format!("unreadable: {}", u.reason),
                )
            })
            .collect()
    }

    pub fn held_back_outcomes(&self) -> Vec<OperationOutcome> {
        let kind = self.transfer_kind();
        self.held_back
            .iter()
            .map(|h| OperationOutcome::skipped(h.relative_path.clone(), kind, h.reason.clone()))
            .collect()
    }

    /// The confirmation request for this plan's destructive batch
    pub fn delete_request(&self) -> ConfirmationRequest {
        let mut paths: Vec<PathBuf> = self
            .delete_set
            .iter()
            .map(|e| e.relative_path.clone())
            .collect();
        if self.direction == Direction::Mirror {
            paths.extend(self.directories.iter().cloned());
        }
        paths.sort();

        ConfirmationRequest {
            operation: GatedOperation::Delete,
            source: self.from_root.clone(),
            destination: self.to_root.clone(),
            paths,
            total_bytes: self.delete_bytes(),
        }
    }

    /// The confirmation request for a restore plan
    pub fn restore_request(&self) -> ConfirmationRequest {
        let mut paths: Vec<PathBuf> = self
            .copy_set
            .iter()
            .map(|e| e.relative_path.clone())
            .collect();
        paths.extend(self.directories.iter().cloned());
        paths.sort();

        ConfirmationRequest {
            operation: GatedOperation::Restore,
            source: self.to_root.clone(),
            destination: self.from_root.clone(),
            paths,
            total_bytes: self.copy_bytes(),
        }
    }
}

/// Record a declined batch: nothing in it is attempted
pub fn skip_all(actions: &[PlannedAction], reason: &str) -> Vec<OperationOutcome> {
    actions
        .iter()
        .map(|a| {
            OperationOutcome::skipped(a.relative_path.clone(), a.kind, reason)
                .on_directory(a.is_directory())
        })
        .collect()
}

pub(crate) fn depth(path: &Path) -> usize {
    path.components().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileRecord;
    use std::collections::BTreeSet;
    use std::time::UNIX_EPOCH;

    fn entry(path: &str, class: Classification, size: u64) -> DiffEntry {
        let record = FileRecord::new(PathBuf::from(path), size, UNIX_EPOCH);
        let (source, dest) = match class {
            Classification::New => (Some(record), None),
            Classification::Orphaned => (None, Some(record)),
            _ => (Some(record.clone()), Some(record)),
        };
        DiffEntry {
            relative_path: PathBuf::from(path),
            classification: class,
            source,
            dest,
        }
    }

    fn diff(entries: Vec<DiffEntry>, dest_only_dirs: &[&str]) -> Diff {
        Diff {
            source_root: PathBuf::from("/src"),
            dest_root: PathBuf::from("/dst"),
            entries,
            unreadable: vec![UnreadableEntry {
                relative_path: PathBuf::from("locked.bin"),
                reason: "permission denied".to_string(),
            }],
            source_only_dirs: BTreeSet::new(),
            dest_only_dirs: dest_only_dirs.iter().map(PathBuf::from).collect(),
        }
    }

    fn abc_diff() -> Diff {
        diff(
            vec![
                entry("A", Classification::New, 1),
                entry("B", Classification::Modified, 2),
                entry("C", Classification::Orphaned, 3),
                entry("D", Classification::Unchanged, 4),
            ],
            &["old", "old/deeper", "old/deeper/deepest", "other"],
        )
    }

    #[test]
    fn test_plan_partitions_diff() {
        let plan = plan(abc_diff(), &PlanOptions::default());

        let copies: Vec<_> = plan.copy_set.iter().map(|e| &e.relative_path).collect();
        assert_eq!(copies, vec![&PathBuf::from("A"), &PathBuf::from("B")]);
        assert_eq!(plan.delete_set.len(), 1);
        assert_eq!(plan.unchanged, 1);
        assert_eq!(plan.copy_bytes(), 3);
        assert_eq!(plan.delete_bytes(), 3);
        assert!(plan.directories.is_empty());
    }

    #[test]
    fn test_copy_actions_target_destination() {
        let plan = plan(abc_diff(), &PlanOptions::default());
        let actions = plan.copy_actions(false);

        assert_eq!(actions.len(), 2);
        assert_eq!(
            actions[0].op,
            FileOp::CopyFile {
                from: PathBuf::from("/src/A"),
                to: PathBuf::from("/dst/A"),
                preserve_root: None,
            }
        );
        assert!(actions.iter().all(|a| a.kind == ActionKind::Copy));
    }

    #[test]
    fn test_preserve_only_applies_to_overwrites() {
        let plan = plan(abc_diff(), &PlanOptions::default());
        let actions = plan.copy_actions(true);

        assert!(matches!(
            &actions[0].op,
            FileOp::CopyFile { preserve_root: None, .. }
        ));
        assert!(matches!(
            &actions[1].op,
            FileOp::CopyFile { preserve_root: Some(root), .. } if root == Path::new("/dst")
        ));
    }

    #[test]
    fn test_prune_batches_deepest_first() {
        let plan = plan(
            abc_diff(),
            &PlanOptions {
                prune_empty_dirs: true,
            },
        );
        let batches = plan.directory_batches();

        let depths: Vec<Vec<String>> = batches
            .iter()
            .map(|b| {
                b.iter()
                    .map(|a| a.relative_path.to_string_lossy().into_owned())
                    .collect()
            })
            .collect();
        assert_eq!(
            depths,
            vec![
                vec!["old/deeper/deepest".to_string()],
                vec!["old/deeper".to_string()],
                vec!["old".to_string(), "other".to_string()],
            ]
        );
    }

    #[test]
    fn test_delete_request_lists_files_and_dirs() {
        let plan = plan(
            abc_diff(),
            &PlanOptions {
                prune_empty_dirs: true,
            },
        );
        let request = plan.delete_request();

        assert_eq!(request.operation, GatedOperation::Delete);
        assert!(request.paths.contains(&PathBuf::from("C")));
        assert!(request.paths.contains(&PathBuf::from("old/deeper")));
        assert_eq!(request.total_bytes, 3);
    }

    #[test]
    fn test_unreadable_becomes_skipped() {
        let plan = plan(abc_diff(), &PlanOptions::default());
        let outcomes = plan.unreadable_outcomes();

        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_skipped());
        assert!(matches!(
            &outcomes[0].result,
            crate::types::OutcomeResult::Skipped(reason) if reason.starts_with("unreadable: ")
        ));
    }

    #[test]
    fn test_skip_all_never_attempts() {
        let plan = plan(abc_diff(), &PlanOptions::default());
        let outcomes = skip_all(&plan.delete_actions(), "deletion declined");

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].attempt_count, 0);
        assert_eq!(outcomes[0].action, ActionKind::Delete);
    }
}
