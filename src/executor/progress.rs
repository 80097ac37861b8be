//! Live progress notifications emitted while a transfer phase runs

use std::time::Duration;

use crate::models::Phase;
use crate::stats;

/// Snapshot of a running phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    pub phase: Phase,
    /// Bytes counted so far across all workers
    pub bytes: u64,
    pub elapsed: Duration,
    /// Running rate over `elapsed`
    pub mbps: f64,
}

impl ProgressUpdate {
    pub fn new(phase: Phase, bytes: u64, elapsed: Duration) -> Self {
        Self {
            phase,
            bytes,
            elapsed,
            mbps: stats::live_mbps(bytes, elapsed),
        }
    }
}

/// Receives progress from worker tasks. Called once per counted segment or
/// upload, from many tasks at once, so implementations should be cheap.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, update: ProgressUpdate);

    /// A phase finished and its final figure is known
    fn on_phase_complete(&self, _phase: Phase) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_progress(&self, _update: ProgressUpdate) {}
}
