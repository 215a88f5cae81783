//! Terminal user interface

pub mod progress;
pub mod prompt;
pub mod summary;

pub use progress::ProgressReporter;
pub use prompt::TerminalConfirmer;
