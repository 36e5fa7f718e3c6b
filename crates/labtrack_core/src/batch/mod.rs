//! Batch pose-tracking inference.
//!
//! Discovers video items under a root, builds one tracking CLI
//! invocation per item, consults the persisted status log for skip
//! decisions, runs each item through the process runner, and writes
//! outcomes back to the log. A bad item never aborts the batch.

mod cli;
mod discovery;
mod launcher;
mod runner;
mod status_log;

pub use cli::{IntegralRefinement, TrackerCliOptions};
pub use discovery::{discover_videos, sanitize_relative, BatchItem};
pub use launcher::launch_labeler;
pub use runner::{BatchError, BatchOptions, BatchRunner, ItemReport, ItemStatus};
pub use status_log::{canon_key, Status, StatusLog};
