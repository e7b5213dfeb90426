//! Command-line orchestration

pub mod commands;
pub mod discovery;

pub use commands::{process_files, run, FileOutcome, RunOptions, RunSummary};
pub use discovery::find_candidates;
