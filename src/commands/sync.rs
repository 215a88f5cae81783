//! Mirror command: make each destination match its source

use super::{
    ensure_free_space, run_batch, run_pairs, scan_and_diff, seed_report, skip_batches,
    Collaborators, CANCELLED,
};
use crate::config::{Config, SyncPair};
use crate::executor::{ParallelExecutor, TrashReason};
use crate::plan::{plan, ActionPlan, SafetyGate};
use crate::report::{ReportAggregator, RunReport, RunSummary};
use crate::types::{MirrorError, PlannedAction};
use tracing::{info, warn};

/// Run the mirror over every configured pair
pub fn run(config: &Config, ctx: &Collaborators<'_>) -> RunReport {
    run_pairs(config, ctx, SyncPair::new, sync_pair)
}

/// Mirror one pair
///
/// Batches run in order: copies, then (if the gate approves) deletes, then
/// empty-directory pruning one depth level at a time.
pub fn sync_pair(
    pair: &SyncPair,
    config: &Config,
    ctx: &Collaborators<'_>,
) -> Result<RunSummary, MirrorError> {
    info!(
        source = %pair.source_root.display(),
        destination = %pair.dest_root.display(),
        "syncing pair"
    );

    let diff = scan_and_diff(
        (&pair.source_root, "source"),
        (&pair.dest_root, "destination"),
        pair,
        &config.diff_options(),
        ctx,
    )?;
    let plan = plan(diff, &config.plan_options());
    ctx.notify(|o| o.plan_ready(&plan, config.dry_run));

    let mut report = seed_report(&plan);
    if config.dry_run || plan.is_empty() {
        return Ok(report.finalize());
    }

    if config.check_free_space {
        ensure_free_space(&pair.dest_root, plan.copy_bytes())?;
    }
    if !pair.dest_root.exists() {
        ctx.fs
            .create_dir(&pair.dest_root)
            .map_err(|e| MirrorError::from_io(&pair.dest_root, e))?;
    }

    let executor = ParallelExecutor::new(
        config.worker_count,
        ctx.fs.clone(),
        config.retry_policy(),
        ctx.cancel.clone(),
    )?;

    run_batch(&executor, "copy", plan.copy_actions(false), &mut report, ctx)?;
    run_destructive(&executor, &plan, config, ctx, &mut report)?;

    Ok(report.finalize())
}

fn run_destructive(
    executor: &ParallelExecutor,
    plan: &ActionPlan,
    config: &Config,
    ctx: &Collaborators<'_>,
    report: &mut ReportAggregator,
) -> Result<(), MirrorError> {
    let deletes = plan.delete_actions();
    let prune_batches = plan.directory_batches();
    if deletes.is_empty() && prune_batches.is_empty() {
        return Ok(());
    }

    if ctx.cancel.is_cancelled() {
        skip_destructive(report, deletes, &prune_batches, CANCELLED);
        return Ok(());
    }

    let gate = SafetyGate::new(config.deletion_policy, ctx.confirmer);
    match gate.evaluate(&plan.delete_request()) {
        Ok(()) => {}
        Err(MirrorError::GateDenied(reason)) => {
            info!(reason = %reason, count = deletes.len(), "deletes not performed");
            skip_destructive(report, deletes, &prune_batches, &reason);
            return Ok(());
        }
        Err(e) => return Err(e),
    }

    let trashed = run_batch(executor, "delete", deletes, report, ctx)?;
    if let Err(e) = ctx
        .fs
        .record_trashed(&plan.to_root, TrashReason::Deleted, &trashed)
    {
        warn!(error = %e, "could not write trash manifest");
    }

    for batch in prune_batches {
        run_batch(executor, "prune", batch, report, ctx)?;
    }
    Ok(())
}

fn skip_destructive(
    report: &mut ReportAggregator,
    deletes: Vec<PlannedAction>,
    prune_batches: &[Vec<PlannedAction>],
    reason: &str,
) {
    skip_batches(report, &[deletes], reason);
    skip_batches(report, prune_batches, reason);
}
