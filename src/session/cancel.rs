//! Per-call cooperative cancellation

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Resettable abort flag shared between the interrupt path and the
/// debugger tool handed to the agent
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    flag: Arc<AtomicBool>,
}

impl AbortSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the in-flight call aborted
    pub fn abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Arm for the next call
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
