//! # hashmirror - hash-verified directory mirroring
//!
//! Content decides what changed, nothing is deleted without asking.
//!
//! Each configured pair is scanned, classified file by file (New, Modified,
//! Unchanged, Orphaned) and reconciled by a bounded worker pool. Copies are
//! atomic, deletions go through a safety gate and land in a trash snapshot,
//! and a restore brings missing or outdated files back from the destination.

// Module declarations
pub mod commands;
pub mod config;
pub mod diff;
pub mod executor;
pub mod hash;
pub mod logging;
pub mod plan;
pub mod report;
pub mod restore;
pub mod scanner;
pub mod types;
pub mod ui;

// Re-export commonly used types
pub use config::{Config, SyncPair};
pub use report::{RunReport, RunSummary};
pub use types::{FileRecord, FileTree, MirrorError, OperationOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
