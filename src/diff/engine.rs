//! Tree join: classify every path of a source/destination pair

use super::{compare_records, Classification, Diff, DiffEntry, DiffOptions, UnreadableEntry};
use crate::scanner::{scan_tree, Exclusions, ProgressCallback};
use crate::types::{FileTree, MirrorError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Join two scanned trees
///
/// Every path present in either tree gets exactly one outcome: a classified
/// [`DiffEntry`], or an [`UnreadableEntry`] when its state cannot be determined
/// (hash failure, or the other side could not be scanned at that path).
pub fn diff(mut source: FileTree, mut dest: FileTree, options: &DiffOptions) -> Diff {
    let source_root = source.root_path.clone();
    let dest_root = dest.root_path.clone();

    let source_entries = std::mem::take(&mut source.entries);
    let mut dest_entries = std::mem::take(&mut dest.entries);

    let mut entries = Vec::with_capacity(source_entries.len() + dest_entries.len());
    let mut unreadable: BTreeMap<PathBuf, String> = BTreeMap::new();

    for (path, reason) in &source.unreadable {
        unreadable.insert(path.clone(), format!("source: {}", reason));
    }
    for (path, reason) in &dest.unreadable {
        unreadable
            .entry(path.clone())
            .or_insert_with(|| format!("destination: {}", reason));
    }

    for (path, mut source_record) in source_entries {
        match dest_entries.remove(&path) {
            Some(mut dest_record) => {
                match compare_records(
                    &source_root,
                    &mut source_record,
                    &dest_root,
                    &mut dest_record,
                    options,
                ) {
                    Ok(classification) => entries.push(DiffEntry {
                        relative_path: path,
                        classification,
                        source: Some(source_record),
                        dest: Some(dest_record),
                    }),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "could not compare file");
                        unreadable.entry(path).or_insert_with(|| e.to_string());
                    }
                }
            }
            None => {
                if let Some(reason) = dest.shadowed_by(&path) {
                    unreadable
                        .entry(path)
                        .or_insert_with(|| format!("destination: {}", reason));
                    continue;
                }
                entries.push(DiffEntry {
                    relative_path: path,
                    classification: Classification::New,
                    source: Some(source_record),
                    dest: None,
                });
            }
        }
    }

    for (path, dest_record) in dest_entries {
        // A source subtree we could not read must never look deleted
        if let Some(reason) = source.shadowed_by(&path) {
            unreadable
                .entry(path)
                .or_insert_with(|| format!("source: {}", reason));
            continue;
        }
        entries.push(DiffEntry {
            relative_path: path,
            classification: Classification::Orphaned,
            source: None,
            dest: Some(dest_record),
        });
    }

    // Unreadable paths never carry a classification
    entries.retain(|e| !unreadable.contains_key(&e.relative_path));
    entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

    let source_only_dirs = source
        .dirs
        .difference(&dest.dirs)
        .filter(|d| !dest.is_shadowed(d))
        .cloned()
        .collect();
    let dest_only_dirs = dest
        .dirs
        .difference(&source.dirs)
        .filter(|d| !source.is_shadowed(d))
        .cloned()
        .collect();

    let diff = Diff {
        source_root,
        dest_root,
        entries,
        unreadable: unreadable
            .into_iter()
            .map(|(relative_path, reason)| UnreadableEntry {
                relative_path,
                reason,
            })
            .collect(),
        source_only_dirs,
        dest_only_dirs,
    };

    debug!(
        new = diff.count(Classification::New),
        modified = diff.count(Classification::Modified),
        unchanged = diff.count(Classification::Unchanged),
        orphaned = diff.count(Classification::Orphaned),
        unreadable = diff.unreadable.len(),
        "diff complete"
    );

    diff
}

/// Scan both roots and join them
///
/// A missing destination is treated as an empty tree; a missing source is a
/// configuration error.
pub fn diff_roots(
    source_root: &Path,
    dest_root: &Path,
    exclusions: &Exclusions,
    options: &DiffOptions,
    on_progress: Option<&ProgressCallback<'_>>,
) -> Result<Diff, MirrorError> {
    info!(root = %source_root.display(), "scanning source");
    let source = scan_tree(source_root, exclusions, on_progress)?;

    let dest = if dest_root.exists() {
        info!(root = %dest_root.display(), "scanning destination");
        scan_tree(dest_root, exclusions, on_progress)?
    } else {
        debug!(root = %dest_root.display(), "destination missing, treating as empty");
        FileTree::new(dest_root.to_path_buf())
    };

    Ok(diff(source, dest, options))
}
