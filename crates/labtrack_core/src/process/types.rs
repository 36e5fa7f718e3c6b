//! Process runner result and error types.

use std::io;

use thiserror::Error;

/// Terminal state of a finished child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitResult {
    /// Raw exit code (-1 when the process died without one).
    pub code: i32,
    /// Whether the process was terminated by a cancellation request.
    pub cancelled: bool,
}

impl ExitResult {
    /// Completed on its own with exit code 0.
    pub fn success(&self) -> bool {
        !self.cancelled && self.code == 0
    }

    /// Completed on its own with a non-zero exit code.
    ///
    /// Cancellation is a distinct terminal outcome, never a failure.
    pub fn failed(&self) -> bool {
        !self.cancelled && self.code != 0
    }
}

/// Errors raised before or while supervising a child process.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The executable could not be located (override, PATH, fallback).
    #[error("tool '{tool}' not found")]
    ToolNotFound { tool: String },

    /// I/O failure while spawning or supervising the child.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl ProcessError {
    /// Create a tool-not-found error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Create an I/O error with operation context.
    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }
}

/// Result type for process operations.
pub type ProcessResult<T> = Result<T, ProcessError>;
