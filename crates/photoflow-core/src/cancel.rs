//! Cooperative cancellation: a shared flag polled at stage checkpoints.
//!
//! Cancellation is a request, not preemption. The registry sets the flag when
//! an item scrolls off-screen; the running stage checks it at its own
//! checkpoints and stops before the next costly step.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation token for one in-flight task. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The stage sees it at its next checkpoint.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
