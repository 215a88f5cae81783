//! OperationOutcome - the immutable record of one planned action

use super::{ActionKind, MirrorError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Category of a failed outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    Io,
    Hash,
    RetryExhausted,
}

/// Result of one action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeResult {
    Success,
    Failed { kind: FailureKind, message: String },
    Skipped(String),
}

impl OutcomeResult {
    /// Convert a per-file error into a failure result
    pub fn failed(error: &MirrorError) -> Self {
        let kind = match error {
            MirrorError::Hash { .. } => FailureKind::Hash,
            MirrorError::RetryExhausted { .. } => FailureKind::RetryExhausted,
            _ => FailureKind::Io,
        };
        OutcomeResult::Failed {
            kind,
            message: error.to_string(),
        }
    }
}

/// One outcome per planned action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutcome {
    pub relative_path: PathBuf,
    pub action: ActionKind,
    pub result: OutcomeResult,
    pub bytes_transferred: u64,
    pub attempt_count: u32,
    pub elapsed_time: Duration,
    /// The action targeted a directory (create or prune), not a file
    #[serde(default)]
    pub directory: bool,
}

impl OperationOutcome {
    pub fn success(
        relative_path: PathBuf,
        action: ActionKind,
        bytes_transferred: u64,
        attempt_count: u32,
        elapsed_time: Duration,
    ) -> Self {
        Self {
            relative_path,
            action,
            result: OutcomeResult::Success,
            bytes_transferred,
            attempt_count,
            elapsed_time,
            directory: false,
        }
    }

    pub fn failed(
        relative_path: PathBuf,
        action: ActionKind,
        error: &MirrorError,
        attempt_count: u32,
        elapsed_time: Duration,
    ) -> Self {
        Self {
            relative_path,
            action,
            result: OutcomeResult::failed(error),
            bytes_transferred: 0,
            attempt_count,
            elapsed_time,
            directory: false,
        }
    }

    /// An action that was never attempted
    pub fn skipped(relative_path: PathBuf, action: ActionKind, reason: impl Into<String>) -> Self {
        Self {
            relative_path,
            action,
            result: OutcomeResult::Skipped(reason.into()),
            bytes_transferred: 0,
            attempt_count: 0,
            elapsed_time: Duration::ZERO,
            directory: false,
        }
    }

    pub fn on_directory(mut self, directory: bool) -> Self {
        self.directory = directory;
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self.result, OutcomeResult::Success)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.result, OutcomeResult::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.result, OutcomeResult::Skipped(_))
    }
}
