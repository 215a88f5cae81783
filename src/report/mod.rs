//! Run report aggregation

use crate::types::{ActionKind, OperationOutcome, OutcomeResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Totals of one run over one pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub copied: usize,
    pub deleted: usize,
    pub restored: usize,
    /// Directories pruned (sync) or created (restore); never in the file counts
    pub directories: usize,
    pub failed: usize,
    pub skipped: usize,
    pub unchanged: usize,
    pub total_bytes: u64,
    pub total_elapsed: Duration,
    /// Failed and skipped outcomes, by (path, action)
    pub outcomes: Vec<OperationOutcome>,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &OperationOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }

    pub fn skips(&self) -> impl Iterator<Item = &OperationOutcome> {
        self.outcomes.iter().filter(|o| o.is_skipped())
    }

    /// Number of actions that changed something
    pub fn changed(&self) -> usize {
        self.copied + self.deleted + self.restored + self.directories
    }
}

/// Collects outcomes from the single aggregation loop
///
/// Totals depend only on the set of recorded outcomes, never on arrival order.
#[derive(Debug)]
pub struct ReportAggregator {
    started: Instant,
    elapsed: Option<Duration>,
    copied: usize,
    deleted: usize,
    restored: usize,
    directories: usize,
    failed: usize,
    skipped: usize,
    unchanged: usize,
    total_bytes: u64,
    kept: Vec<OperationOutcome>,
    recorded: usize,
}

impl Default for ReportAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportAggregator {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            elapsed: None,
            copied: 0,
            deleted: 0,
            restored: 0,
            directories: 0,
            failed: 0,
            skipped: 0,
            unchanged: 0,
            total_bytes: 0,
            kept: Vec::new(),
            recorded: 0,
        }
    }

    pub fn record(&mut self, outcome: OperationOutcome) {
        self.recorded += 1;
        match &outcome.result {
            OutcomeResult::Success => {
                self.total_bytes += outcome.bytes_transferred;
                match outcome.action {
                    _ if outcome.directory => self.directories += 1,
                    ActionKind::Copy => self.copied += 1,
                    ActionKind::Delete => self.deleted += 1,
                    ActionKind::Restore => self.restored += 1,
                }
            }
            OutcomeResult::Failed { .. } => {
                self.failed += 1;
                self.kept.push(outcome);
            }
            OutcomeResult::Skipped(_) => {
                self.skipped += 1;
                self.kept.push(outcome);
            }
        }
    }

    pub fn record_all(&mut self, outcomes: impl IntoIterator<Item = OperationOutcome>) {
        for outcome in outcomes {
            self.record(outcome);
        }
    }

    pub fn add_unchanged(&mut self, count: usize) {
        self.unchanged += count;
    }

    /// Outcomes recorded so far
    pub fn recorded(&self) -> usize {
        self.recorded
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Build the summary. The elapsed time is frozen at the first call, so
    /// calling this again yields an identical summary.
    pub fn finalize(&mut self) -> RunSummary {
        let total_elapsed = *self.elapsed.get_or_insert_with(|| self.started.elapsed());

        let mut outcomes = self.kept.clone();
        outcomes.sort_by(|a, b| {
            (&a.relative_path, a.action).cmp(&(&b.relative_path, b.action))
        });

        RunSummary {
            copied: self.copied,
            deleted: self.deleted,
            restored: self.restored,
            directories: self.directories,
            failed: self.failed,
            skipped: self.skipped,
            unchanged: self.unchanged,
            total_bytes: self.total_bytes,
            total_elapsed,
            outcomes,
        }
    }
}

/// Outcome of one pair in a multi-pair run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PairOutcome {
    Completed(RunSummary),
    /// The pair could not run at all (bad config, disk full, ...)
    Aborted(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairReport {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub outcome: PairOutcome,
}

/// Everything a run did, pair by pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub pairs: Vec<PairReport>,
    pub cancelled: bool,
}

impl RunReport {
    pub fn push(&mut self, source: PathBuf, destination: PathBuf, outcome: PairOutcome) {
        self.pairs.push(PairReport {
            source,
            destination,
            outcome,
        });
    }

    pub fn summaries(&self) -> impl Iterator<Item = &RunSummary> {
        self.pairs.iter().filter_map(|p| match &p.outcome {
            PairOutcome::Completed(summary) => Some(summary),
            PairOutcome::Aborted(_) => None,
        })
    }

    pub fn is_clean(&self) -> bool {
        self.pairs.iter().all(|p| match &p.outcome {
            PairOutcome::Completed(summary) => !summary.has_failures(),
            PairOutcome::Aborted(_) => false,
        })
    }

    /// 0 when clean, 130 when cancelled, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.cancelled {
            130
        } else if self.is_clean() {
            0
        } else {
            1
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
