//! Core type definitions for hashmirror

mod action;
mod entry;
mod error;
mod outcome;
mod tree;

pub use action::{ActionKind, DeleteMethod, DeletionPolicy, FileOp, PlannedAction};
pub use entry::{EntryKind, FileRecord};
pub use error::MirrorError;
pub use outcome::{FailureKind, OperationOutcome, OutcomeResult};
pub use tree::FileTree;
