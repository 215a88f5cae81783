//! Progress reporting

use super::summary::{format_dry_run_actions, format_pair_outcome, format_plan_preview};
use crate::commands::SyncObserver;
use crate::executor::ExecutionEvent;
use crate::plan::ActionPlan;
use crate::report::PairOutcome;
use crate::types::OutcomeResult;
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Terminal progress for sync, restore and diff runs
///
/// One spinner per scan, one bar per executed batch.
pub struct ProgressReporter {
    visible: bool,
    scan_bar: Mutex<Option<ProgressBar>>,
    transfer_bar: Mutex<Option<ProgressBar>>,
    transfer_started_at: Mutex<Option<Instant>>,
    transferred_bytes: AtomicU64,
}

impl ProgressReporter {
    /// Create a new progress reporter. With `visible` false nothing is drawn,
    /// but plans and summaries are still printed.
    pub fn new(visible: bool) -> Self {
        Self {
            visible,
            scan_bar: Mutex::new(None),
            transfer_bar: Mutex::new(None),
            transfer_started_at: Mutex::new(None),
            transferred_bytes: AtomicU64::new(0),
        }
    }

    fn spinner(&self) -> ProgressBar {
        if !self.visible {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new_spinner();
        bar.enable_steady_tick(Duration::from_millis(120));
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
        }
        bar
    }

    fn bar(&self, len: u64) -> ProgressBar {
        if !self.visible {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::with_template("{bar:30.cyan/blue} {pos}/{len} {prefix} | {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }
        bar
    }

    fn current_scan(&self) -> Option<ProgressBar> {
        self.scan_bar.lock().ok().and_then(|bar| bar.clone())
    }

    fn current_transfer(&self) -> Option<ProgressBar> {
        self.transfer_bar.lock().ok().and_then(|bar| bar.clone())
    }

    /// Print a block of text without tearing an active bar
    fn print(&self, text: &str) {
        match self.current_transfer().or_else(|| self.current_scan()) {
            Some(bar) => bar.suspend(|| println!("{}", text)),
            None => println!("{}", text),
        }
    }

    fn current_throughput_bps(&self) -> u64 {
        let started = self.transfer_started_at.lock().ok().and_then(|s| *s);
        match started {
            Some(started) => {
                let secs = started.elapsed().as_secs_f64();
                if secs > 0.0 {
                    (self.transferred_bytes.load(Ordering::Relaxed) as f64 / secs) as u64
                } else {
                    0
                }
            }
            None => 0,
        }
    }
}

impl SyncObserver for ProgressReporter {
    fn scan_started(&self, label: &str) {
        let bar = self.spinner();
        bar.set_message(format!("Scanning {}...", label));
        if let Ok(mut slot) = self.scan_bar.lock() {
            *slot = Some(bar);
        }
    }

    fn scan_progress(&self, label: &str, files: u64, bytes: u64) {
        if let Some(bar) = self.current_scan() {
            bar.set_message(format!(
                "Scanning {}... {} files | {}",
                label,
                files,
                HumanBytes(bytes)
            ));
        }
    }

    fn scan_finished(&self, label: &str, files: usize, bytes: u64) {
        if let Some(bar) = self.current_scan() {
            bar.finish_with_message(format!(
                "Scanned {}: {} files | {}",
                label,
                files,
                HumanBytes(bytes)
            ));
        }
    }

    fn plan_ready(&self, plan: &ActionPlan, dry_run: bool) {
        self.print(&format_plan_preview(plan));
        if dry_run {
            self.print(&format_dry_run_actions(plan));
            self.print("Dry-run mode: no changes were made.");
        }
    }

    fn batch_started(&self, label: &str, actions: usize, bytes: u64) {
        if let Ok(mut started) = self.transfer_started_at.lock() {
            started.get_or_insert_with(Instant::now);
        }
        let bar = self.bar(actions as u64);
        bar.set_prefix(label.to_string());
        bar.set_message(format!("{} planned", HumanBytes(bytes)));
        if let Ok(mut slot) = self.transfer_bar.lock() {
            *slot = Some(bar);
        }
    }

    fn execution_event(&self, event: &ExecutionEvent<'_>) {
        let Some(bar) = self.current_transfer() else {
            return;
        };
        match event {
            ExecutionEvent::Outcome(outcome) => {
                self.transferred_bytes
                    .fetch_add(outcome.bytes_transferred, Ordering::Relaxed);
                if let OutcomeResult::Failed { message, .. } = &outcome.result {
                    bar.println(format!(
                        "ERROR {} {}: {}",
                        outcome.action,
                        outcome.relative_path.display(),
                        message
                    ));
                }
            }
            ExecutionEvent::Progress { completed, .. } => {
                bar.set_position(*completed as u64);
                bar.set_message(format!(
                    "{} transferred | {}/s",
                    HumanBytes(self.transferred_bytes.load(Ordering::Relaxed)),
                    HumanBytes(self.current_throughput_bps())
                ));
            }
        }
    }

    fn batch_finished(&self, _label: &str) {
        if let Some(bar) = self.current_transfer() {
            bar.finish();
        }
    }

    fn pair_finished(&self, source: &Path, destination: &Path, outcome: &PairOutcome) {
        self.print(&format_pair_outcome(source, destination, outcome));
        if let Ok(mut slot) = self.transfer_bar.lock() {
            *slot = None;
        }
        if let Ok(mut slot) = self.scan_bar.lock() {
            *slot = None;
        }
    }
}
