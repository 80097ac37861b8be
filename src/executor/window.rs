//! Shared state of a transfer phase: the byte counter and the deadline

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

/// Stand-in deadline when `start + duration` is not representable
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Running byte total shared by every worker of a phase
#[derive(Debug, Clone, Default)]
pub struct ByteCounter {
    total: Arc<AtomicU64>,
}

impl ByteCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `bytes` and return the new total
    pub fn add(&self, bytes: u64) -> u64 {
        self.total.fetch_add(bytes, Ordering::Relaxed) + bytes
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}

/// Time window a transfer phase may count bytes in.
///
/// Every worker holds a clone. The window closes at `end` or when any holder
/// calls [`cancel`](Self::cancel), whichever comes first; work raced through
/// [`guard`](Self::guard) is dropped at that moment.
#[derive(Debug, Clone)]
pub struct TransferWindow {
    start: Instant,
    end: Instant,
    cancel: CancellationToken,
}

impl TransferWindow {
    /// Open a window of `duration` starting now
    pub fn open(duration: Duration) -> Self {
        let start = Instant::now();
        let end = start
            .checked_add(duration)
            .or_else(|| start.checked_add(FAR_FUTURE))
            .unwrap_or(start);
        Self {
            start,
            end,
            cancel: CancellationToken::new(),
        }
    }

    pub fn start(&self) -> Instant {
        self.start
    }

    pub fn end(&self) -> Instant {
        self.end
    }

    /// True while the deadline is ahead and nobody cancelled
    pub fn is_open(&self) -> bool {
        !self.cancel.is_cancelled() && Instant::now() < self.end
    }

    /// Time since the window opened
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Close the window for every worker
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run `fut` until it completes or the window closes. Returns `None` if
    /// the window closed first; `fut` is dropped in that case, which aborts
    /// any request it owns.
    pub async fn guard<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            _ = sleep_until(self.end) => None,
            output = fut => Some(output),
        }
    }
}
