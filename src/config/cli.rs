//! Command-line interface

use super::{Config, PairConfig};
use crate::hash::HashAlgorithm;
use crate::restore::RestoreMode;
use crate::types::{DeleteMethod, DeletionPolicy, MirrorError};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Hash-verified directory mirroring
#[derive(Debug, Parser)]
#[command(name = "hashmirror", version, about, long_about = None)]
pub struct Cli {
    /// TOML config file with sync pairs and defaults
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Concurrent file operations [default: number of CPUs]
    #[arg(long, short = 'j', global = true)]
    pub workers: Option<usize>,

    /// Attempts per file operation, including the first
    #[arg(long, global = true)]
    pub retries: Option<u32>,

    /// Base delay between attempts, doubled after each failure
    #[arg(long, global = true, value_name = "MS")]
    pub retry_delay_ms: Option<u64>,

    /// How deletions are confirmed
    #[arg(long, value_enum, global = true)]
    pub policy: Option<DeletionPolicy>,

    /// Do not ask for confirmation (same as --policy auto-confirm)
    #[arg(long, short = 'y', global = true, conflicts_with = "policy")]
    pub yes: bool,

    /// Delete permanently instead of moving to .hashmirror_trash
    #[arg(long, global = true)]
    pub permanent: bool,

    /// Trust equal size and mtime instead of hashing every candidate pair
    #[arg(long, global = true)]
    pub no_hash_always: bool,

    /// Digest used for content comparison
    #[arg(long, value_enum, global = true)]
    pub algorithm: Option<HashAlgorithm>,

    /// Write the run report as JSON to this file
    #[arg(long, global = true, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Log filter, e.g. `info` or `hashmirror=debug` [default: RUST_LOG or warn]
    #[arg(long, global = true, value_name = "FILTER")]
    pub log_level: Option<String>,

    /// Hide progress bars
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Mirror source into destination
    Sync(SyncArgs),
    /// Bring missing or outdated files back from the destination
    Restore(RestoreArgs),
    /// Show differences without changing anything
    Diff(DiffArgs),
}

/// A pair given on the command line; replaces the config file's pairs
#[derive(Debug, Args, Default)]
pub struct PairArgs {
    /// Source directory
    pub source: Option<PathBuf>,

    /// Destination directory
    pub destination: Option<PathBuf>,

    /// Exclude a relative path prefix or glob (repeatable)
    #[arg(long = "exclude", short = 'e', value_name = "PATTERN")]
    pub exclude: Vec<String>,
}

#[derive(Debug, Args)]
pub struct SyncArgs {
    #[command(flatten)]
    pub pair: PairArgs,

    /// Show the plan, change nothing
    #[arg(long, short = 'n')]
    pub dry_run: bool,

    /// Remove destination-only directories left empty
    #[arg(long)]
    pub prune_empty_dirs: bool,

    /// Skip the free-space check
    #[arg(long)]
    pub no_space_check: bool,
}

#[derive(Debug, Args)]
pub struct RestoreArgs {
    #[command(flatten)]
    pub pair: PairArgs,

    /// Which differing files to bring back
    #[arg(long, value_enum)]
    pub mode: Option<RestoreMode>,

    /// Overwrite source files without keeping a copy in the source's trash
    #[arg(long)]
    pub no_backup: bool,

    /// Show the plan, change nothing
    #[arg(long, short = 'n')]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct DiffArgs {
    #[command(flatten)]
    pub pair: PairArgs,
}

impl Cli {
    /// Build the effective configuration: file (or defaults), then CLI overrides
    pub fn resolve_config(&self) -> Result<Config, MirrorError> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(workers) = self.workers {
            config.worker_count = workers;
        }
        if let Some(retries) = self.retries {
            config.retry_attempts = retries;
        }
        if let Some(delay) = self.retry_delay_ms {
            config.retry_base_delay_ms = delay;
        }
        if let Some(policy) = self.policy {
            config.deletion_policy = policy;
        }
        if self.yes {
            config.deletion_policy = DeletionPolicy::AutoConfirm;
        }
        if self.permanent {
            config.delete_method = DeleteMethod::Permanent;
        }
        if self.no_hash_always {
            config.hash_always = false;
        }
        if let Some(algorithm) = self.algorithm {
            config.hash_algorithm = algorithm;
        }

        let pair = match &self.command {
            Command::Sync(args) => {
                config.dry_run |= args.dry_run;
                config.prune_empty_dirs |= args.prune_empty_dirs;
                if args.no_space_check {
                    config.check_free_space = false;
                }
                &args.pair
            }
            Command::Restore(args) => {
                config.dry_run |= args.dry_run;
                if let Some(mode) = args.mode {
                    config.restore_mode = mode;
                }
                if args.no_backup {
                    config.backup_before_restore = false;
                }
                &args.pair
            }
            Command::Diff(args) => &args.pair,
        };
        apply_pair(&mut config, pair)?;

        config.validate()?;
        Ok(config)
    }
}

fn apply_pair(config: &mut Config, pair: &PairArgs) -> Result<(), MirrorError> {
    match (&pair.source, &pair.destination) {
        (Some(source), Some(destination)) => {
            config.sync_pairs = vec![PairConfig {
                source: source.clone(),
                destination: destination.clone(),
                exclusions: pair.exclude.clone(),
            }];
            Ok(())
        }
        (Some(_), None) => Err(MirrorError::Config(
            "DESTINATION is required when SOURCE is given".to_string(),
        )),
        _ => {
            // Exclusions without a pair extend every configured pair
            for configured in &mut config.sync_pairs {
                configured.exclusions.extend(pair.exclude.iter().cloned());
            }
            Ok(())
        }
    }
}
