//! External process execution and tool resolution.
//!
//! Every conversion, clip export, and batch item ends in the same shape
//! of work: locate an executable, run it with arguments, stream its
//! combined output line-by-line, and report the exit status. This module
//! is that shared primitive.
//!
//! # Contract
//!
//! - Output lines are delivered as they arrive, never buffered until
//!   completion, so a console view can show live tool output.
//! - Cancellation is cooperative: the runner polls a [`CancelToken`]
//!   between output deliveries and terminates the child when triggered.
//! - A non-zero exit code is a result, not an error - callers decide
//!   whether it aborts a queue or just marks one item failed.
//! - A missing executable fails fast with [`ProcessError::ToolNotFound`]
//!   before anything is spawned.
//!
//! [`CancelToken`]: crate::cancel::CancelToken

mod resolve;
mod runner;
mod types;

pub use resolve::{resolve_conda_executable, resolve_tool, CondaFallback, ResolvedCommand, ToolCandidate};
pub use runner::{run_streaming, CommandSpec};
pub use types::{ExitResult, ProcessError, ProcessResult};
