//! Run one planned action against the filesystem capability

use super::fs::FileSystem;
use super::retry::RetryPolicy;
use crate::types::{FileOp, OperationOutcome, PlannedAction};
use std::io;
use std::time::Instant;
use tracing::debug;

enum Applied {
    Done(u64),
    /// Directory still has children; nothing was removed
    NotEmpty,
}

/// Execute a single action with retry and timing
///
/// Always yields exactly one outcome; errors never escape.
pub fn execute(fs: &dyn FileSystem, action: &PlannedAction, retry: &RetryPolicy) -> OperationOutcome {
    let start = Instant::now();
    let retried = retry.run(|| apply(fs, action));
    let elapsed = start.elapsed();

    let outcome = match retried.result {
        Ok(Applied::Done(bytes)) => OperationOutcome::success(
            action.relative_path.clone(),
            action.kind,
            bytes,
            retried.attempts,
            elapsed,
        ),
        Ok(Applied::NotEmpty) => OperationOutcome {
            attempt_count: retried.attempts,
            elapsed_time: elapsed,
            ..OperationOutcome::skipped(
                action.relative_path.clone(),
                action.kind,
                "directory not empty",
            )
        },
        Err(e) => OperationOutcome::failed(
            action.relative_path.clone(),
            action.kind,
            &e,
            retried.attempts,
            elapsed,
        ),
    }
    .on_directory(action.is_directory());

    debug!(
        path = %action.relative_path.display(),
        action = action.action_name(),
        attempts = outcome.attempt_count,
        success = outcome.is_success(),
        "action finished"
    );
    outcome
}

fn apply(fs: &dyn FileSystem, action: &PlannedAction) -> io::Result<Applied> {
    match &action.op {
        FileOp::CopyFile {
            from,
            to,
            preserve_root,
        } => {
            if let Some(root) = preserve_root {
                fs.preserve_file(root, &action.relative_path)?;
            }
            fs.copy_file(from, to).map(Applied::Done)
        }
        FileOp::CopySymlink { target, to } => fs.copy_symlink(target, to).map(|_| Applied::Done(0)),
        FileOp::DeleteFile { root } => fs
            .delete_file(root, &action.relative_path)
            .map(|_| Applied::Done(0)),
        FileOp::CreateDir { path } => fs.create_dir(path).map(|_| Applied::Done(0)),
        FileOp::RemoveDir { path } => fs.remove_empty_dir(path).map(|removed| {
            if removed {
                Applied::Done(0)
            } else {
                Applied::NotEmpty
            }
        }),
    }
}
