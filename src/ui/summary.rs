//! Plain-text plan previews, run summaries and error reports

use crate::commands::diff::PairDiff;
use crate::diff::{Classification, Diff};
use crate::plan::{ActionPlan, Direction};
use crate::report::{PairOutcome, RunReport, RunSummary};
use crate::types::{FailureKind, OperationOutcome, OutcomeResult};
use indicatif::HumanBytes;
use std::collections::BTreeMap;
use std::path::Path;

/// Entries listed per error group before collapsing the rest
const ERRORS_PER_GROUP: usize = 3;

pub fn format_plan_preview(plan: &ActionPlan) -> String {
    match plan.direction {
        Direction::Mirror => format!(
            "Plan: {} -> {}\n  Copy: {}  Update: {}  Delete: {}  Prune dirs: {}  Unchanged: {}  Unreadable: {}\n  Total bytes to transfer: {}",
            plan.from_root.display(),
            plan.to_root.display(),
            plan.copy_set.iter().filter(|e| e.dest.is_none()).count(),
            plan.copy_set.iter().filter(|e| e.dest.is_some()).count(),
            plan.delete_set.len(),
            plan.directories.len(),
            plan.unchanged,
            plan.unreadable.len(),
            HumanBytes(plan.copy_bytes())
        ),
        Direction::Restore => format!(
            "Restore plan: {} -> {}\n  Restore: {}  Overwrite: {}  Create dirs: {}  Held back: {}  Unchanged: {}  Unreadable: {}\n  Total bytes to transfer: {}",
            plan.from_root.display(),
            plan.to_root.display(),
            plan.copy_set.iter().filter(|e| e.dest.is_none()).count(),
            plan.copy_set.iter().filter(|e| e.dest.is_some()).count(),
            plan.directories.len(),
            plan.held_back.len(),
            plan.unchanged,
            plan.unreadable.len(),
            HumanBytes(plan.copy_bytes())
        ),
    }
}

pub fn format_dry_run_actions(plan: &ActionPlan) -> String {
    let mut lines = vec!["Dry-run actions:".to_string()];

    if plan.direction == Direction::Restore {
        for dir in &plan.directories {
            lines.push(format!("  MKDIR     {}", dir.display()));
        }
    }
    for entry in &plan.copy_set {
        let verb = match (plan.direction, entry.dest.is_some()) {
            (Direction::Mirror, false) => "COPY",
            (Direction::Mirror, true) => "UPDATE",
            (Direction::Restore, false) => "RESTORE",
            (Direction::Restore, true) => "OVERWRITE",
        };
        lines.push(format!("  {:<9} {}", verb, entry.relative_path.display()));
    }
    for entry in &plan.delete_set {
        lines.push(format!("  DELETE    {}", entry.relative_path.display()));
    }
    if plan.direction == Direction::Mirror {
        for dir in &plan.directories {
            lines.push(format!("  RMDIR     {}", dir.display()));
        }
    }
    for held in &plan.held_back {
        lines.push(format!(
            "  HOLD      {} ({})",
            held.relative_path.display(),
            held.reason
        ));
    }
    for unreadable in &plan.unreadable {
        lines.push(format!(
            "  UNREAD    {} ({})",
            unreadable.relative_path.display(),
            unreadable.reason
        ));
    }

    if lines.len() == 1 {
        lines.push("  (no planned actions)".to_string());
    }
    if plan.unchanged > 0 {
        lines.push(format!("  ({} unchanged file(s) omitted)", plan.unchanged));
    }
    lines.join("\n")
}

/// One-line result for a pair, plus its error summary if anything failed
pub fn format_pair_outcome(source: &Path, destination: &Path, outcome: &PairOutcome) -> String {
    match outcome {
        PairOutcome::Completed(summary) => {
            let mut text = format!(
                "{} -> {}: {}",
                source.display(),
                destination.display(),
                format_totals(summary)
            );
            if summary.has_failures() {
                text.push('\n');
                text.push_str(&format_error_summary(summary));
            }
            text
        }
        PairOutcome::Aborted(reason) => format!(
            "{} -> {}: aborted: {}",
            source.display(),
            destination.display(),
            reason
        ),
    }
}

pub fn format_totals(summary: &RunSummary) -> String {
    format!(
        "{} copied, {} deleted, {} restored, {} dir(s), {} failed, {} skipped, {} unchanged | {} in {:.2?}",
        summary.copied,
        summary.deleted,
        summary.restored,
        summary.directories,
        summary.failed,
        summary.skipped,
        summary.unchanged,
        HumanBytes(summary.total_bytes),
        summary.total_elapsed
    )
}

/// Closing line of a multi-pair run
pub fn format_run_footer(report: &RunReport) -> String {
    let completed = report.summaries().count();
    let aborted = report.pairs.len() - completed;
    let failed: usize = report.summaries().map(|s| s.failed).sum();

    let mut text = format!(
        "{} pair(s): {} completed, {} aborted, {} failed action(s)",
        report.pairs.len(),
        completed,
        aborted,
        failed
    );
    if report.cancelled {
        text.push_str(" (cancelled)");
    }
    text
}

#[derive(Debug)]
struct ErrorRecord<'a> {
    kind: &'static str,
    path: &'a Path,
    message: &'a str,
    suggestion: Option<&'static str>,
}

impl<'a> ErrorRecord<'a> {
    fn new(outcome: &'a OperationOutcome) -> Option<Self> {
        let OutcomeResult::Failed { kind, message } = &outcome.result else {
            return None;
        };
        let (label, suggestion) = humanize_failure(*kind, message);
        Some(Self {
            kind: label,
            path: &outcome.relative_path,
            message,
            suggestion,
        })
    }
}

fn humanize_failure(kind: FailureKind, message: &str) -> (&'static str, Option<&'static str>) {
    let lower = message.to_ascii_lowercase();
    match kind {
        FailureKind::Hash => (
            "Hash error",
            Some("The file changed or vanished while being read. Re-run once it is stable."),
        ),
        FailureKind::RetryExhausted => (
            "Gave up after retries",
            Some("The error looked transient. Retry later or raise --retries."),
        ),
        FailureKind::Io if lower.contains("permission denied") => (
            "Permission denied",
            Some("Check file permissions or run with a user that has access."),
        ),
        FailureKind::Io if lower.contains("is a directory") || lower.contains("not a directory") => (
            "File/directory conflict",
            Some("Remove or rename the conflicting path, then retry."),
        ),
        FailureKind::Io if lower.contains("no space") || lower.contains("disk full") => (
            "Disk full",
            Some("Free disk space on the receiving side and retry."),
        ),
        FailureKind::Io => (
            "I/O error",
            Some("Retry the sync. If this keeps happening, check disk health and permissions."),
        ),
    }
}

/// Failures grouped by kind, a few examples each
pub fn format_error_summary(summary: &RunSummary) -> String {
    let mut groups: BTreeMap<&'static str, Vec<ErrorRecord<'_>>> = BTreeMap::new();
    for record in summary.failures().filter_map(ErrorRecord::new) {
        groups.entry(record.kind).or_default().push(record);
    }

    let mut lines = vec!["Error summary:".to_string()];
    for (kind, items) in groups {
        lines.push(format!("  {} ({}):", kind, items.len()));
        for record in items.iter().take(ERRORS_PER_GROUP) {
            lines.push(format!("    - {}", record.message));
            lines.push(format!("      Path: {}", record.path.display()));
            if let Some(suggestion) = record.suggestion {
                lines.push(format!("      Try: {}", suggestion));
            }
        }
        if items.len() > ERRORS_PER_GROUP {
            lines.push(format!("    - ... {} more", items.len() - ERRORS_PER_GROUP));
        }
    }
    lines.join("\n")
}

/// Listing for the `diff` subcommand; unchanged files are only counted
pub fn format_diff(diff: &Diff) -> String {
    let mut lines = vec![format!(
        "Diff: {} -> {}",
        diff.source_root.display(),
        diff.dest_root.display()
    )];
    for entry in &diff.entries {
        let marker = match entry.classification {
            Classification::New => '+',
            Classification::Modified => '~',
            Classification::Orphaned => '-',
            Classification::Unchanged => continue,
        };
        lines.push(format!("  {} {}", marker, entry.relative_path.display()));
    }
    for unreadable in &diff.unreadable {
        lines.push(format!(
            "  ? {} ({})",
            unreadable.relative_path.display(),
            unreadable.reason
        ));
    }
    lines.push(format!(
        "  new: {}  modified: {}  orphaned: {}  unchanged: {}  unreadable: {}",
        diff.count(Classification::New),
        diff.count(Classification::Modified),
        diff.count(Classification::Orphaned),
        diff.count(Classification::Unchanged),
        diff.unreadable.len()
    ));
    lines.join("\n")
}

pub fn format_pair_diff(pair: &PairDiff) -> String {
    match &pair.result {
        Ok(diff) => format_diff(diff),
        Err(reason) => format!(
            "{} -> {}: aborted: {}",
            pair.source.display(),
            pair.destination.display(),
            reason
        ),
    }
}
