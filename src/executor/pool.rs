//! Concurrent executor.
//!
//! One batch at a time:
//! - a single dispatcher task feeds a bounded MPMC job queue
//! - `worker_count` workers pull jobs and run each on tokio's blocking pool
//! - every outcome is sent to one aggregation loop, the only writer of the report

use super::fs::FileSystem;
use super::operator::execute;
use super::retry::RetryPolicy;
use super::{CancelToken, ExecutionCallback, ExecutionEvent};
use crate::report::ReportAggregator;
use crate::types::{MirrorError, OperationOutcome, OutcomeResult, PlannedAction};
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc;
use tracing::{debug, info};

const CANCELLED: &str = "cancelled";

/// Counters for one executed batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    pub workers: usize,
    pub dispatched: usize,
    pub completed: usize,
    /// Actions recorded as skipped because of cancellation
    pub cancelled: usize,
    pub per_worker_completed: Vec<usize>,
}

impl PoolStats {
    fn new(workers: usize) -> Self {
        Self {
            workers,
            dispatched: 0,
            completed: 0,
            cancelled: 0,
            per_worker_completed: vec![0; workers],
        }
    }
}

struct WorkerMessage {
    /// `None` when the dispatcher skipped the action itself
    worker: Option<usize>,
    outcome: OperationOutcome,
}

/// Bounded worker pool backed by a private tokio runtime
pub struct ParallelExecutor {
    runtime: Runtime,
    workers: usize,
    fs: Arc<dyn FileSystem>,
    retry: RetryPolicy,
    cancel: CancelToken,
}

impl ParallelExecutor {
    pub fn new(
        worker_count: usize,
        fs: Arc<dyn FileSystem>,
        retry: RetryPolicy,
        cancel: CancelToken,
    ) -> Result<Self, MirrorError> {
        let workers = worker_count.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(workers.min(4))
            .max_blocking_threads(workers)
            .thread_name("hashmirror-worker")
            .enable_all()
            .build()
            .map_err(MirrorError::Io)?;

        Ok(Self {
            runtime,
            workers,
            fs,
            retry,
            cancel,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run one batch to completion
    ///
    /// Every action yields exactly one outcome in `report`, whether it ran,
    /// failed, or was skipped by cancellation. No ordering between actions.
    pub fn execute(
        &self,
        actions: Vec<PlannedAction>,
        report: &mut ReportAggregator,
        on_event: Option<&ExecutionCallback<'_>>,
    ) -> Result<PoolStats, MirrorError> {
        let mut stats = PoolStats::new(self.workers);
        let total = actions.len();
        if total == 0 {
            return Ok(stats);
        }

        let total_bytes_estimate: u64 = actions.iter().map(|a| a.expected_bytes).sum();
        info!(actions = total, workers = self.workers, "executing batch");

        self.runtime.block_on(async {
            let (job_tx, job_rx) = async_channel::bounded::<PlannedAction>(self.workers * 2);
            let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel::<WorkerMessage>();

            let dispatcher = tokio::spawn(dispatcher_loop(
                actions,
                job_tx,
                outcome_tx.clone(),
                self.cancel.clone(),
            ));

            let mut worker_handles = Vec::with_capacity(self.workers);
            for worker_id in 0..self.workers {
                worker_handles.push(tokio::spawn(worker_loop(
                    worker_id,
                    job_rx.clone(),
                    outcome_tx.clone(),
                    Arc::clone(&self.fs),
                    self.retry,
                    self.cancel.clone(),
                )));
            }
            // Only the tasks hold channel ends now; the loop below ends when they finish.
            drop(job_rx);
            drop(outcome_tx);

            let mut completed = 0usize;
            let mut bytes_done = 0u64;
            while let Some(message) = outcome_rx.recv().await {
                completed += 1;
                bytes_done += message.outcome.bytes_transferred;
                if let Some(slot) = message
                    .worker
                    .and_then(|id| stats.per_worker_completed.get_mut(id))
                {
                    *slot += 1;
                }
                if matches!(&message.outcome.result, OutcomeResult::Skipped(r) if r == CANCELLED) {
                    stats.cancelled += 1;
                }

                emit_event(on_event, ExecutionEvent::Outcome(&message.outcome));
                report.record(message.outcome);
                emit_event(
                    on_event,
                    ExecutionEvent::Progress {
                        completed,
                        total,
                        bytes_done,
                        total_bytes_estimate,
                    },
                );
            }

            stats.dispatched = dispatcher.await.map_err(map_join_error)?;
            for handle in worker_handles {
                handle.await.map_err(map_join_error)?;
            }
            stats.completed = completed;
            Ok::<(), MirrorError>(())
        })?;

        if stats.completed != total {
            return Err(MirrorError::Validation(format!(
                "executor recorded {} outcome(s) for {} action(s)",
                stats.completed, total
            )));
        }

        debug!(
            dispatched = stats.dispatched,
            cancelled = stats.cancelled,
            "batch finished"
        );
        Ok(stats)
    }
}

async fn dispatcher_loop(
    actions: Vec<PlannedAction>,
    job_tx: async_channel::Sender<PlannedAction>,
    outcome_tx: mpsc::UnboundedSender<WorkerMessage>,
    cancel: CancelToken,
) -> usize {
    let mut dispatched = 0usize;
    let mut pending = actions.into_iter();

    while let Some(action) = pending.next() {
        if cancel.is_cancelled() {
            skip_cancelled(&outcome_tx, &action);
            break;
        }
        if let Err(async_channel::SendError(action)) = job_tx.send(action).await {
            skip_cancelled(&outcome_tx, &action);
            break;
        }
        dispatched += 1;
    }

    for action in pending {
        skip_cancelled(&outcome_tx, &action);
    }
    // job_tx is dropped here, which lets idle workers exit.
    dispatched
}

async fn worker_loop(
    worker_id: usize,
    job_rx: async_channel::Receiver<PlannedAction>,
    outcome_tx: mpsc::UnboundedSender<WorkerMessage>,
    fs: Arc<dyn FileSystem>,
    retry: RetryPolicy,
    cancel: CancelToken,
) {
    while let Ok(action) = job_rx.recv().await {
        let outcome = if cancel.is_cancelled() {
            OperationOutcome::skipped(action.relative_path.clone(), action.kind, CANCELLED)
                .on_directory(action.is_directory())
        } else {
            let path = action.relative_path.clone();
            let kind = action.kind;
            let directory = action.is_directory();
            let fs = Arc::clone(&fs);
            match tokio::task::spawn_blocking(move || execute(fs.as_ref(), &action, &retry)).await
            {
                Ok(outcome) => outcome,
                Err(e) => OperationOutcome::failed(
                    path,
                    kind,
                    &MirrorError::Validation(format!("worker task failed: {}", e)),
                    0,
                    std::time::Duration::ZERO,
                )
                .on_directory(directory),
            }
        };

        if outcome_tx
            .send(WorkerMessage {
                worker: Some(worker_id),
                outcome,
            })
            .is_err()
        {
            break;
        }
    }
}

fn skip_cancelled(outcome_tx: &mpsc::UnboundedSender<WorkerMessage>, action: &PlannedAction) {
    let _ = outcome_tx.send(WorkerMessage {
        worker: None,
        outcome: OperationOutcome::skipped(action.relative_path.clone(), action.kind, CANCELLED)
            .on_directory(action.is_directory()),
    });
}

fn emit_event(on_event: Option<&ExecutionCallback<'_>>, event: ExecutionEvent<'_>) {
    if let Some(callback) = on_event {
        callback(&event);
    }
}

fn map_join_error(error: tokio::task::JoinError) -> MirrorError {
    MirrorError::Validation(format!("parallel executor task failed: {}", error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActionKind, FileOp};
    use std::io;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Recording {
        copies: AtomicUsize,
        /// Cancel this token after the first copy
        cancel_after_first: Option<CancelToken>,
    }

    impl FileSystem for Recording {
        fn copy_file(&self, _from: &Path, _to: &Path) -> io::Result<u64> {
            self.copies.fetch_add(1, Ordering::SeqCst);
            if let Some(token) = &self.cancel_after_first {
                token.cancel();
            }
            Ok(1)
        }
        fn copy_symlink(&self, _target: &Path, _to: &Path) -> io::Result<()> {
            Ok(())
        }
        fn delete_file(&self, _root: &Path, _relative: &Path) -> io::Result<()> {
            Ok(())
        }
        fn create_dir(&self, _path: &Path) -> io::Result<()> {
            Ok(())
        }
        fn remove_empty_dir(&self, _path: &Path) -> io::Result<bool> {
            Ok(true)
        }
        fn preserve_file(&self, _root: &Path, _relative: &Path) -> io::Result<bool> {
            Ok(false)
        }
    }

    fn copies(n: usize) -> Vec<PlannedAction> {
        (0..n)
            .map(|i| {
                let name = format!("f{i:03}");
                PlannedAction::new(
                    PathBuf::from(&name),
                    ActionKind::Copy,
                    FileOp::CopyFile {
                        from: PathBuf::from("/s").join(&name),
                        to: PathBuf::from("/d").join(&name),
                        preserve_root: None,
                    },
                    1,
                )
            })
            .collect()
    }

    fn retry() -> RetryPolicy {
        RetryPolicy::new(1, Duration::ZERO)
    }

    #[test]
    fn test_every_action_yields_one_outcome() {
        let fs = Arc::new(Recording::default());
        let pool =
            ParallelExecutor::new(4, fs.clone(), retry(), CancelToken::new()).expect("create pool");
        let mut report = ReportAggregator::new();

        let stats = pool.execute(copies(64), &mut report, None).expect("execute");

        assert_eq!(stats.completed, 64);
        assert_eq!(stats.dispatched, 64);
        assert_eq!(fs.copies.load(Ordering::SeqCst), 64);
        assert_eq!(report.finalize().copied, 64);
    }

    #[test]
    fn test_empty_batch() {
        let pool = ParallelExecutor::new(2, Arc::new(Recording::default()), retry(), CancelToken::new())
            .expect("create pool");
        let mut report = ReportAggregator::new();

        let stats = pool.execute(Vec::new(), &mut report, None).unwrap();
        assert_eq!(stats.completed, 0);
        assert_eq!(report.recorded(), 0);
    }

    #[test]
    fn test_enforces_minimum_one_worker() {
        let pool = ParallelExecutor::new(0, Arc::new(Recording::default()), retry(), CancelToken::new())
            .expect("create pool");
        assert_eq!(pool.workers(), 1);

        let mut report = ReportAggregator::new();
        let stats = pool.execute(copies(3), &mut report, None).unwrap();
        assert_eq!(stats.per_worker_completed, vec![3]);
    }

    #[test]
    fn test_cancellation_skips_remaining_work() {
        let cancel = CancelToken::new();
        let fs = Arc::new(Recording {
            copies: AtomicUsize::new(0),
            cancel_after_first: Some(cancel.clone()),
        });
        let pool = ParallelExecutor::new(1, fs.clone(), retry(), cancel).unwrap();
        let mut report = ReportAggregator::new();

        let stats = pool.execute(copies(50), &mut report, None).unwrap();
        let summary = report.finalize();

        assert_eq!(stats.completed, 50);
        assert_eq!(summary.copied + summary.skipped, 50);
        assert_eq!(summary.copied, fs.copies.load(Ordering::SeqCst));
        assert!(summary.skipped > 0);
        assert!(summary
            .skips()
            .all(|o| o.result == OutcomeResult::Skipped("cancelled".into())));
    }

    #[test]
    fn test_progress_events_reach_total() {
        let pool = ParallelExecutor::new(3, Arc::new(Recording::default()), retry(), CancelToken::new())
            .unwrap();
        let mut report = ReportAggregator::new();
        let last = Mutex::new((0usize, 0usize, 0u64));
        let outcomes = AtomicUsize::new(0);
        let callback = |event: &ExecutionEvent<'_>| match event {
            ExecutionEvent::Progress {
                completed,
                total,
                bytes_done,
                ..
            } => *last.lock().unwrap() = (*completed, *total, *bytes_done),
            ExecutionEvent::Outcome(_) => {
                outcomes.fetch_add(1, Ordering::SeqCst);
            }
        };

        pool.execute(copies(10), &mut report, Some(&callback)).unwrap();

        assert_eq!(*last.lock().unwrap(), (10, 10, 10));
        assert_eq!(outcomes.load(Ordering::SeqCst), 10);
    }
}
