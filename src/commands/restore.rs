//! Restore command: bring files back from the destination into the source

use super::{
    ensure_free_space, run_batch, run_pairs, scan_and_diff, seed_report, skip_batches,
    Collaborators, CANCELLED,
};
use crate::config::{Config, SyncPair};
use crate::executor::{ParallelExecutor, TrashReason};
use crate::plan::SafetyGate;
use crate::report::{RunReport, RunSummary};
use crate::restore::restore_plan;
use crate::types::MirrorError;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{info, warn};

/// Run a restore over every configured pair
pub fn run(config: &Config, ctx: &Collaborators<'_>) -> RunReport {
    run_pairs(config, ctx, SyncPair::for_restore, restore_pair)
}

/// Restore one pair
///
/// The destination is read-only here. A missing source root is created, then
/// missing directories inside it, then files are copied. Nothing is ever deleted.
pub fn restore_pair(
    pair: &SyncPair,
    config: &Config,
    ctx: &Collaborators<'_>,
) -> Result<RunSummary, MirrorError> {
    if !pair.dest_root.is_dir() {
        return Err(MirrorError::Config(format!(
            "Backup {} does not exist",
            pair.dest_root.display()
        )));
    }
    info!(
        backup = %pair.dest_root.display(),
        source = %pair.source_root.display(),
        mode = ?config.restore_mode,
        "restoring pair"
    );

    let reversed = scan_and_diff(
        (&pair.dest_root, "backup"),
        (&pair.source_root, "source"),
        pair,
        &config.diff_options(),
        ctx,
    )?;
    let plan = restore_plan(reversed, config.restore_mode);
    ctx.notify(|o| o.plan_ready(&plan, config.dry_run));

    let mut report = seed_report(&plan);
    if config.dry_run || plan.is_empty() {
        return Ok(report.finalize());
    }

    let dir_batches = plan.directory_batches();
    let copies = plan.copy_actions(config.backup_before_restore);

    if ctx.cancel.is_cancelled() {
        skip_batches(&mut report, &dir_batches, CANCELLED);
        skip_batches(&mut report, &[copies], CANCELLED);
        return Ok(report.finalize());
    }

    let gate = SafetyGate::new(config.deletion_policy, ctx.confirmer);
    match gate.evaluate(&plan.restore_request()) {
        Ok(()) => {}
        Err(MirrorError::GateDenied(reason)) => {
            info!(reason = %reason, "restore not performed");
            skip_batches(&mut report, &dir_batches, &reason);
            skip_batches(&mut report, &[copies], &reason);
            return Ok(report.finalize());
        }
        Err(e) => return Err(e),
    }

    if config.check_free_space {
        ensure_free_space(&pair.source_root, plan.copy_bytes())?;
    }

    let executor = ParallelExecutor::new(
        config.worker_count,
        ctx.fs.clone(),
        config.retry_policy(),
        ctx.cancel.clone(),
    )?;

    if !pair.source_root.exists() {
        ctx.fs
            .create_dir(&pair.source_root)
            .map_err(|e| MirrorError::from_io(&pair.source_root, e))?;
    }
    for batch in dir_batches {
        run_batch(&executor, "mkdir", batch, &mut report, ctx)?;
    }

    // Live sizes of the files a successful copy will have preserved
    let overwritten: HashMap<PathBuf, u64> = if config.backup_before_restore {
        plan.copy_set
            .iter()
            .filter_map(|e| e.dest.as_ref().map(|live| (e.relative_path.clone(), live.size)))
            .collect()
    } else {
        HashMap::new()
    };

    let restored = run_batch(&executor, "restore", copies, &mut report, ctx)?;
    let preserved: Vec<(PathBuf, u64)> = restored
        .into_iter()
        .filter_map(|(path, _)| overwritten.get(&path).map(|size| (path, *size)))
        .collect();
    if let Err(e) = ctx
        .fs
        .record_trashed(&plan.to_root, TrashReason::Preserved, &preserved)
    {
        warn!(error = %e, "could not write trash manifest");
    }

    Ok(report.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PairConfig;
    use crate::executor::{CancelToken, FileSystem, LocalFs, TRASH_DIR};
    use crate::plan::StaticConfirmer;
    use crate::restore::RestoreMode;
    use crate::types::{DeleteMethod, DeletionPolicy};
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup() -> (TempDir, SyncPair) {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let backup = temp.path().join("backup");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(backup.join("docs/old")).unwrap();
        fs::write(backup.join("docs/old/lost.txt"), b"lost").unwrap();
        fs::write(backup.join("edited.txt"), b"from backup").unwrap();
        fs::write(src.join("edited.txt"), b"damaged copy").unwrap();
        fs::write(src.join("local_only.txt"), b"keep me").unwrap();

        let pair = SyncPair::new(&PairConfig {
            source: src,
            destination: backup,
            exclusions: Vec::new(),
        })
        .unwrap();
        (temp, pair)
    }

    fn run_with(pair: &SyncPair, config: &Config, answer: bool) -> RunSummary {
        let confirmer = StaticConfirmer(answer);
        let fs: Arc<dyn FileSystem> = Arc::new(LocalFs::new(DeleteMethod::Trash));
        let ctx = Collaborators::new(&confirmer, fs, CancelToken::new());
        restore_pair(pair, config, &ctx).unwrap()
    }

    fn config(mode: RestoreMode) -> Config {
        Config {
            restore_mode: mode,
            deletion_policy: DeletionPolicy::AutoConfirm,
            worker_count: 2,
            retry_base_delay_ms: 1,
            ..Config::default()
        }
    }

    #[test]
    fn test_force_restore_recovers_and_preserves() {
        let (_temp, pair) = setup();

        let summary = run_with(&pair, &config(RestoreMode::Force), true);

        assert_eq!(summary.restored, 2, "lost.txt and edited.txt");
        assert_eq!(summary.directories, 2, "docs and docs/old");
        assert_eq!(summary.failed, 0);
        assert_eq!(
            fs::read(pair.source_root.join("docs/old/lost.txt")).unwrap(),
            b"lost"
        );
        assert_eq!(
            fs::read(pair.source_root.join("edited.txt")).unwrap(),
            b"from backup"
        );
        assert!(pair.source_root.join("local_only.txt").exists());
        assert!(pair.source_root.join(TRASH_DIR).is_dir());
    }

    #[test]
    fn test_missing_mode_leaves_existing_files() {
        let (_temp, pair) = setup();

        let summary = run_with(&pair, &config(RestoreMode::Missing), true);

        assert_eq!(
            fs::read(pair.source_root.join("edited.txt")).unwrap(),
            b"damaged copy"
        );
        assert!(pair.source_root.join("docs/old/lost.txt").exists());
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn test_declined_restore_touches_nothing() {
        let (_temp, pair) = setup();
        let config = Config {
            deletion_policy: DeletionPolicy::AlwaysConfirm,
            ..config(RestoreMode::Force)
        };

        let summary = run_with(&pair, &config, false);

        assert_eq!(summary.restored, 0);
        assert!(!pair.source_root.join("docs").exists());
        assert!(summary
            .skips()
            .all(|o| o.result == crate::types::OutcomeResult::Skipped("restore declined".into())));
    }

    #[test]
    fn test_missing_backup_aborts_pair() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        let pair = SyncPair::new(&PairConfig {
            source: src,
            destination: temp.path().join("never-synced"),
            exclusions: Vec::new(),
        })
        .unwrap();
        let confirmer = StaticConfirmer(true);
        let fs: Arc<dyn FileSystem> = Arc::new(LocalFs::new(DeleteMethod::Trash));
        let ctx = Collaborators::new(&confirmer, fs, CancelToken::new());

        let result = restore_pair(&pair, &config(RestoreMode::Force), &ctx);
        assert!(matches!(result, Err(MirrorError::Config(_))));
    }
}
