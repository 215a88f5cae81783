//! Diff command: classify every pair without touching either tree

use super::{scan_and_diff, Collaborators};
use crate::config::{Config, SyncPair};
use crate::diff::Diff;
use std::path::PathBuf;
use tracing::error;

/// Classification of one configured pair, or why it could not be produced
#[derive(Debug)]
pub struct PairDiff {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub result: Result<Diff, String>,
}

impl PairDiff {
    pub fn is_clean(&self) -> bool {
        matches!(&self.result, Ok(diff) if diff.is_clean())
    }
}

/// Diff every configured pair. The confirmer and filesystem are never used.
pub fn run(config: &Config, ctx: &Collaborators<'_>) -> Vec<PairDiff> {
    config
        .sync_pairs
        .iter()
        .map(|pair_config| {
            let result = SyncPair::new(pair_config)
                .and_then(|pair| {
                    scan_and_diff(
                        (&pair.source_root, "source"),
                        (&pair.dest_root, "destination"),
                        &pair,
                        &config.diff_options(),
                        ctx,
                    )
                })
                .map_err(|e| {
                    error!(source = %pair_config.source.display(), error = %e, "diff failed");
                    e.to_string()
                });
            PairDiff {
                source: pair_config.source.clone(),
                destination: pair_config.destination.clone(),
                result,
            }
        })
        .collect()
}

/// 0 when every pair was diffed and is already in sync, 1 otherwise
pub fn exit_code(diffs: &[PairDiff]) -> i32 {
    if diffs.iter().all(PairDiff::is_clean) {
        0
    } else {
        1
    }
}
