//! File comparison logic

use super::{Classification, DiffOptions};
use crate::hash::hash_record;
use crate::types::{EntryKind, FileRecord, MirrorError};
use std::path::Path;

/// Compare a source and destination record that share a relative path
///
/// 1. **Kind mismatch** (file vs symlink) → Modified
/// 2. **Both symlinks** → Unchanged iff the targets are equal
/// 3. **Size mismatch** → Modified, nothing is hashed
/// 4. **Metadata fast path**: with `hash_always = false`, equal mtimes → Unchanged
/// 5. **Content**: digests of both files decide, whatever the mtimes say
///
/// Computed digests are stored on the records so later stages do not re-hash.
///
/// # Errors
/// `MirrorError::Hash` when either side cannot be read completely. The caller
/// must treat the path as indeterminate, never as Unchanged.
pub fn compare_records(
    source_root: &Path,
    source: &mut FileRecord,
    dest_root: &Path,
    dest: &mut FileRecord,
    options: &DiffOptions,
) -> Result<Classification, MirrorError> {
    match (&source.kind, &dest.kind) {
        (EntryKind::Symlink { target: a }, EntryKind::Symlink { target: b }) => {
            return Ok(if a == b {
                Classification::Unchanged
            } else {
                Classification::Modified
            });
        }
        (EntryKind::File, EntryKind::File) => {}
        _ => return Ok(Classification::Modified),
    }

    if source.size != dest.size {
        return Ok(Classification::Modified);
    }

    if !options.hash_always && source.modification_time == dest.modification_time {
        return Ok(Classification::Unchanged);
    }

    let source_hash = match source.content_hash {
        Some(digest) => digest,
        None => {
            let digest = hash_record(source_root, source, options.algorithm)?;
            source.content_hash = Some(digest);
            digest
        }
    };
    let dest_hash = match dest.content_hash {
        Some(digest) => digest,
        None => {
            let digest = hash_record(dest_root, dest, options.algorithm)?;
            dest.content_hash = Some(digest);
            digest
        }
    };

    Ok(if source_hash == dest_hash {
        Classification::Unchanged
    } else {
        Classification::Modified
    })
}
