//! Cooperative cancellation token shared across worker layers.
//!
//! The token is checked between subprocess output deliveries and before
//! each queued task starts. Cancelling never abandons a child process:
//! the process runner terminates the child when it observes the flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Handle for cancelling in-flight work.
///
/// Clones share the same flag, so a token created on the control thread
/// can be handed to a worker and triggered from either side.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a new, untriggered token.
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation.
    ///
    /// Running work stops at the next check point (output delivery or
    /// task boundary).
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
