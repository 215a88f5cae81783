//! Directory scanning logic

mod filter;
mod walker;

pub use filter::Exclusions;
pub use walker::{scan_tree, ProgressCallback, IGNORE_FILE_NAME};
