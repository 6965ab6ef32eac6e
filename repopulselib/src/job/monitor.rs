//! Read-only view of pool health.

use serde::{Deserialize, Serialize};

/// Point-in-time snapshot of a worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolState {
    pub pool_size: usize,
    /// Workers currently running a pipeline
    pub busy_workers: usize,
    /// Jobs waiting for a worker
    pub queue_depth: usize,
    pub queue_capacity: usize,
    /// Lifetime count of completed jobs
    pub completed: u64,
    /// Lifetime count of failed jobs
    pub failed: u64,
    /// Every job ever accepted
    pub submitted: usize,
    /// Whether new submissions are accepted
    pub accepting: bool,
}

impl PoolState {
    pub fn idle_workers(&self) -> usize {
        self.pool_size.saturating_sub(self.busy_workers)
    }

    /// Accepted jobs not yet finished.
    pub fn in_flight(&self) -> usize {
        self.submitted
            .saturating_sub((self.completed + self.failed) as usize)
    }

    pub fn queue_full(&self) -> bool {
        self.queue_depth >= self.queue_capacity
    }
}
