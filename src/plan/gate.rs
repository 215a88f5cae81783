//! Safety gate for destructive batches

use crate::types::{DeletionPolicy, MirrorError};
use std::path::PathBuf;

/// What a confirmation request is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatedOperation {
    /// Deleting orphaned destination files (and pruning their directories)
    Delete,
    /// Overwriting or recreating files in the source from the backup
    Restore,
}

impl GatedOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatedOperation::Delete => "delete",
            GatedOperation::Restore => "restore",
        }
    }
}

/// Everything a confirmer needs to decide on one batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationRequest {
    pub operation: GatedOperation,
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Relative paths in the batch, sorted
    pub paths: Vec<PathBuf>,
    pub total_bytes: u64,
}

/// Synchronous yes/no collaborator
///
/// Only `true` approves; anything else (including a confirmer that cannot ask)
/// must return `false`.
pub trait Confirmer: Send + Sync {
    fn confirm(&self, request: &ConfirmationRequest) -> bool;
}

/// Fixed answer, for non-interactive runs
#[derive(Debug, Clone, Copy)]
pub struct StaticConfirmer(pub bool);

impl Confirmer for StaticConfirmer {
    fn confirm(&self, _request: &ConfirmationRequest) -> bool {
        self.0
    }
}

/// Applies the deletion policy to one batch at a time
pub struct SafetyGate<'a> {
    policy: DeletionPolicy,
    confirmer: &'a dyn Confirmer,
}

impl<'a> SafetyGate<'a> {
    pub fn new(policy: DeletionPolicy, confirmer: &'a dyn Confirmer) -> Self {
        Self { policy, confirmer }
    }

    /// Decide on one batch. Empty batches are approved without asking.
    ///
    /// A refusal is `GateDenied` carrying the skip reason for every action of
    /// the batch. Restores are never disabled outright: under `NeverDelete`
    /// they still ask.
    pub fn evaluate(&self, request: &ConfirmationRequest) -> Result<(), MirrorError> {
        if request.paths.is_empty() {
            return Ok(());
        }

        let policy = match (request.operation, self.policy) {
            (GatedOperation::Restore, DeletionPolicy::NeverDelete) => {
                DeletionPolicy::AlwaysConfirm
            }
            (_, policy) => policy,
        };

        match policy {
            DeletionPolicy::NeverDelete => Err(MirrorError::GateDenied(
                "deletion disabled by policy".to_string(),
            )),
            DeletionPolicy::AutoConfirm => Ok(()),
            DeletionPolicy::AlwaysConfirm => {
                if self.confirmer.confirm(request) {
                    Ok(())
                } else {
                    Err(MirrorError::GateDenied(format!(
                        "{} declined",
                        noun(request.operation)
                    )))
                }
            }
        }
    }
}

fn noun(operation: GatedOperation) -> &'static str {
    match operation {
        GatedOperation::Delete => "deletion",
        GatedOperation::Restore => "restore",
    }
}
