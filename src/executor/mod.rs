//! Executor module for file operations

pub mod copy;
pub mod fs;
pub mod operator;
pub mod pool;
pub mod retry;
pub mod trash;

use crate::types::OperationOutcome;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use copy::{copy_file_atomic, PART_SUFFIX};
pub use fs::{FileSystem, LocalFs, TrashReason};
pub use operator::execute;
pub use pool::{ParallelExecutor, PoolStats};
pub use retry::{RetryPolicy, Retried};
pub use trash::{Trash, TRASH_DIR};

/// Events emitted while a batch executes, from the aggregation loop only.
#[derive(Debug)]
pub enum ExecutionEvent<'a> {
    /// An action finished (successfully or not) or was skipped
    Outcome(&'a OperationOutcome),
    /// Running totals for the current batch
    Progress {
        completed: usize,
        total: usize,
        bytes_done: u64,
        total_bytes_estimate: u64,
    },
}

/// Optional callback used to receive execution events.
pub type ExecutionCallback<'a> = dyn Fn(&ExecutionEvent<'_>) + Send + Sync + 'a;

/// Cooperative cancellation flag shared by the dispatcher, the workers and
/// whoever requests the stop (Ctrl-C handler, tests).
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();
        assert!(clone.is_cancelled());
    }
}
