//! Per-pair orchestration shared by the subcommands

pub mod diff;
pub mod restore;
pub mod sync;

use crate::config::{Config, PairConfig, SyncPair};
use crate::diff::{diff as join_trees, Diff, DiffOptions};
use crate::executor::{CancelToken, ExecutionEvent, FileSystem, ParallelExecutor};
use crate::plan::{skip_all, ActionPlan, Confirmer};
use crate::report::{PairOutcome, ReportAggregator, RunReport, RunSummary};
use crate::scanner::{scan_tree, ProgressCallback};
use crate::types::{FileTree, MirrorError, PlannedAction};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};

pub(crate) const CANCELLED: &str = "cancelled";

/// Receives progress from a running command. Every method is optional.
pub trait SyncObserver: Send + Sync {
    fn scan_started(&self, _label: &str) {}

    fn scan_progress(&self, _label: &str, _files: u64, _bytes: u64) {}

    fn scan_finished(&self, _label: &str, _files: usize, _bytes: u64) {}

    /// The plan for one pair is ready; called before anything executes
    fn plan_ready(&self, _plan: &ActionPlan, _dry_run: bool) {}

    fn batch_started(&self, _label: &str, _actions: usize, _bytes: u64) {}

    fn execution_event(&self, _event: &ExecutionEvent<'_>) {}

    fn batch_finished(&self, _label: &str) {}

    fn pair_finished(&self, _source: &Path, _destination: &Path, _outcome: &PairOutcome) {}
}

/// Everything a command needs besides the configuration
pub struct Collaborators<'a> {
    pub confirmer: &'a dyn Confirmer,
    pub observer: Option<&'a dyn SyncObserver>,
    pub fs: Arc<dyn FileSystem>,
    pub cancel: CancelToken,
}

impl<'a> Collaborators<'a> {
    pub fn new(confirmer: &'a dyn Confirmer, fs: Arc<dyn FileSystem>, cancel: CancelToken) -> Self {
        Self {
            confirmer,
            observer: None,
            fs,
            cancel,
        }
    }

    pub fn with_observer(mut self, observer: &'a dyn SyncObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    fn notify(&self, f: impl FnOnce(&dyn SyncObserver)) {
        if let Some(observer) = self.observer {
            f(observer);
        }
    }
}

type PairRunner = fn(&SyncPair, &Config, &Collaborators<'_>) -> Result<RunSummary, MirrorError>;
type PairResolver = fn(&PairConfig) -> Result<SyncPair, MirrorError>;

/// Resolve every configured pair with `resolve` and run `per_pair` on it
///
/// A failing pair is recorded as aborted and the next pair still runs.
/// Pairs not reached because of cancellation are recorded as aborted too.
pub(crate) fn run_pairs(
    config: &Config,
    ctx: &Collaborators<'_>,
    resolve: PairResolver,
    per_pair: PairRunner,
) -> RunReport {
    let mut report = RunReport::default();

    for pair_config in &config.sync_pairs {
        let outcome = if ctx.cancel.is_cancelled() {
            PairOutcome::Aborted(CANCELLED.to_string())
        } else {
            match resolve(pair_config).and_then(|pair| per_pair(&pair, config, ctx)) {
                Ok(summary) => PairOutcome::Completed(summary),
                Err(e) => {
                    error!(
                        source = %pair_config.source.display(),
                        destination = %pair_config.destination.display(),
                        error = %e,
                        "pair aborted"
                    );
                    PairOutcome::Aborted(e.to_string())
                }
            }
        };

        ctx.notify(|o| o.pair_finished(&pair_config.source, &pair_config.destination, &outcome));
        report.push(
            pair_config.source.clone(),
            pair_config.destination.clone(),
            outcome,
        );
    }

    report.cancelled = ctx.cancel.is_cancelled();
    report
}

/// Scan `from` and `to` (labelled for the observer) and classify them
///
/// A missing `to` tree is treated as empty.
pub(crate) fn scan_and_diff(
    from: (&Path, &str),
    to: (&Path, &str),
    pair: &SyncPair,
    options: &DiffOptions,
    ctx: &Collaborators<'_>,
) -> Result<Diff, MirrorError> {
    let source = scan_labelled(from.0, from.1, pair, ctx)?;
    let dest = if to.0.exists() {
        scan_labelled(to.0, to.1, pair, ctx)?
    } else {
        debug!(root = %to.0.display(), "{} missing, treating as empty", to.1);
        FileTree::new(to.0.to_path_buf())
    };
    Ok(join_trees(source, dest, options))
}

fn scan_labelled(
    root: &Path,
    label: &str,
    pair: &SyncPair,
    ctx: &Collaborators<'_>,
) -> Result<FileTree, MirrorError> {
    info!(root = %root.display(), "scanning {}", label);
    ctx.notify(|o| o.scan_started(label));

    let on_progress = |files: u64, bytes: u64| {
        ctx.notify(|o| o.scan_progress(label, files, bytes));
    };
    let callback: &ProgressCallback<'_> = &on_progress;
    let tree = scan_tree(root, &pair.exclusions, ctx.observer.map(|_| callback))?;

    ctx.notify(|o| o.scan_finished(label, tree.total_files, tree.total_size));
    Ok(tree)
}

/// Start a report with the outcomes that are known before anything runs
pub(crate) fn seed_report(plan: &ActionPlan) -> ReportAggregator {
    let mut report = ReportAggregator::new();
    report.add_unchanged(plan.unchanged);
    report.record_all(plan.unreadable_outcomes());
    report.record_all(plan.held_back_outcomes());
    report
}

/// Refuse to start when `root` (or its nearest existing ancestor) has less
/// than `needed` bytes available
pub fn ensure_free_space(root: &Path, needed: u64) -> Result<(), MirrorError> {
    if needed == 0 {
        return Ok(());
    }
    let mut existing = root;
    while !existing.exists() {
        match existing.parent() {
            Some(parent) => existing = parent,
            None => return Ok(()),
        }
    }

    let available = fs2::available_space(existing).map_err(|e| MirrorError::from_io(existing, e))?;
    if available < needed {
        return Err(MirrorError::DiskFull { available, needed });
    }
    Ok(())
}

/// Run one batch and return the `(relative path, expected bytes)` of every
/// action that succeeded
pub(crate) fn run_batch(
    executor: &ParallelExecutor,
    label: &str,
    actions: Vec<PlannedAction>,
    report: &mut ReportAggregator,
    ctx: &Collaborators<'_>,
) -> Result<Vec<(PathBuf, u64)>, MirrorError> {
    if actions.is_empty() {
        return Ok(Vec::new());
    }

    let sizes: HashMap<PathBuf, u64> = actions
        .iter()
        .map(|a| (a.relative_path.clone(), a.expected_bytes))
        .collect();
    let bytes: u64 = sizes.values().sum();
    ctx.notify(|o| o.batch_started(label, actions.len(), bytes));

    let succeeded = Mutex::new(Vec::new());
    let on_event = |event: &ExecutionEvent<'_>| {
        if let ExecutionEvent::Outcome(outcome) = event {
            if outcome.is_success() {
                if let Ok(mut done) = succeeded.lock() {
                    let size = sizes.get(&outcome.relative_path).copied().unwrap_or(0);
                    done.push((outcome.relative_path.clone(), size));
                }
            }
        }
        ctx.notify(|o| o.execution_event(event));
    };

    let stats = executor.execute(actions, report, Some(&on_event))?;
    debug!(
        batch = label,
        completed = stats.completed,
        cancelled = stats.cancelled,
        "batch done"
    );
    ctx.notify(|o| o.batch_finished(label));

    let mut done = succeeded
        .into_inner()
        .map_err(|_| MirrorError::Validation("batch result lock poisoned".to_string()))?;
    done.sort();
    Ok(done)
}

/// Record every action of `batches` as skipped with `reason`
pub(crate) fn skip_batches(
    report: &mut ReportAggregator,
    batches: &[Vec<PlannedAction>],
    reason: &str,
) {
    for batch in batches {
        report.record_all(skip_all(batch, reason));
    }
}
