//! Cross-thread stop signal for traversal runs.
//!
//! Every `cancel` bumps a shared epoch. A command remembers the epoch it was
//! accepted at, and its run stops once the epoch has moved past that value,
//! so a cancel also reaches commands still waiting in the queue.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared cancel epoch checked by the sequencer between goal dispatches.
///
/// Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicU64>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop every run accepted before this call, before its next goal.
    pub fn cancel(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    /// Current epoch; stamp a command with this when it is accepted.
    pub fn epoch(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// Has a cancel landed after `epoch`?
    pub fn is_cancelled_since(&self, epoch: u64) -> bool {
        self.epoch() > epoch
    }
}
