//! Download phase: parallel workers pulling chunks until the window closes

use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use futures::future::join_all;

use crate::client::{DownloadBody, SpeedTestTransport};
use crate::error::Result;
use crate::logging::Logger;
use crate::models::{Phase, ThroughputResult};
use crate::stats;

use super::progress::{ProgressObserver, ProgressUpdate};
use super::window::{ByteCounter, TransferWindow};
use super::SpeedTestPlan;

/// Why a download worker stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerStop {
    /// The window closed
    Deadline,
    /// A request or body read failed; the worker gave up quietly
    Failed(String),
}

struct DownloadWorker {
    id: usize,
    transport: Arc<dyn SpeedTestTransport>,
    window: TransferWindow,
    counter: ByteCounter,
    observer: Arc<dyn ProgressObserver>,
    logger: Logger,
    chunk_size: u64,
}

impl DownloadWorker {
    async fn run(self) -> WorkerStop {
        let stop = self.download_until_closed().await;

        if let WorkerStop::Failed(reason) = &stop {
            self.logger
                .debug(&format!("Download worker {} stopped: {}", self.id, reason))
                .field("worker", self.id)
                .log()
                .await;
        }
        stop
    }

    async fn download_until_closed(&self) -> WorkerStop {
        while self.window.is_open() {
            let body = match self.window.guard(self.transport.download(self.chunk_size)).await {
                None => return WorkerStop::Deadline,
                Some(Ok(body)) => body,
                Some(Err(e)) => return WorkerStop::Failed(e.to_string()),
            };

            if let Some(stop) = self.drain(body).await {
                return stop;
            }
        }
        WorkerStop::Deadline
    }

    /// Count one response body. `None` when the body ended normally.
    async fn drain(&self, mut body: DownloadBody) -> Option<WorkerStop> {
        loop {
            match self.window.guard(body.next()).await {
                // Returning drops `body`, which aborts the transfer
                None => return Some(WorkerStop::Deadline),
                Some(None) => return None,
                Some(Some(Ok(segment))) => {
                    let total = self.counter.add(segment.len() as u64);
                    self.observer
                        .on_progress(ProgressUpdate::new(Phase::Download, total, self.window.elapsed()));
                },
                Some(Some(Err(e))) => return Some(WorkerStop::Failed(e.to_string())),
            }
        }
    }
}

/// Run `plan.download_workers` workers against one shared deadline and
/// report total bytes over total wall-clock time.
///
/// A failing worker stops without failing the phase; bytes it counted
/// before the failure stay in the total.
pub async fn run_download_phase(
    transport: Arc<dyn SpeedTestTransport>,
    plan: &SpeedTestPlan,
    observer: Arc<dyn ProgressObserver>,
    logger: &Logger,
) -> Result<ThroughputResult> {
    let counter = ByteCounter::new();
    let started_at = Utc::now();
    let window = TransferWindow::open(plan.duration);

    let workers = (0..plan.download_workers).map(|id| {
        let worker = DownloadWorker {
            id,
            transport: transport.clone(),
            window: window.clone(),
            counter: counter.clone(),
            observer: observer.clone(),
            logger: logger.clone(),
            chunk_size: plan.chunk_size,
        };
        tokio::spawn(worker.run())
    });

    let mut failed = 0usize;
    for joined in join_all(workers).await {
        if let WorkerStop::Failed(_) = joined? {
            failed += 1;
        }
    }

    let elapsed = window.elapsed();
    let bytes = counter.total();
    let result = ThroughputResult {
        phase: Phase::Download,
        bytes,
        elapsed,
        mbps: stats::throughput_mbps(bytes, elapsed),
        workers: plan.download_workers,
        started_at,
    };

    logger
        .info(&result.summary_line())
        .throughput(&result)
        .field("failed_workers", failed)
        .log()
        .await;

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::progress::NoopObserver;
    use crate::executor::testing::{FakeTransport, RecordingObserver, quick_plan};
    use std::time::Duration;

    fn silent() -> Logger {
        Logger::silent("test".to_string())
    }

    #[tokio::test(start_paused = true)]
    async fn test_workers_stop_at_deadline() {
        let transport = Arc::new(FakeTransport::new().with_segments(1000, Duration::from_millis(10)));
        let plan = quick_plan();

        let result = run_download_phase(transport.clone(), &plan, Arc::new(NoopObserver), &silent())
            .await
            .unwrap();

        assert_eq!(result.phase, Phase::Download);
        assert_eq!(result.workers, 3);
        assert!(result.elapsed >= plan.duration);
        assert!(result.elapsed < plan.duration + Duration::from_millis(50));
        assert!(result.bytes > 0);
        assert_eq!(result.bytes % 1000, 0);
        // At most one segment per 10ms per worker
        assert!(result.bytes <= 3 * 100 * 1000);
        assert!(result.mbps > 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_chunks_are_requested_again() {
        let transport = Arc::new(
            FakeTransport::new()
                .with_segments(1000, Duration::from_millis(10))
                .with_segments_per_chunk(5),
        );
        let plan = quick_plan();

        run_download_phase(transport.clone(), &plan, Arc::new(NoopObserver), &silent())
            .await
            .unwrap();

        // Each chunk lasts 50ms, so every worker issues many requests
        assert!(transport.download_calls() >= 3 * 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_body_is_abandoned_at_deadline() {
        let transport = Arc::new(
            FakeTransport::new()
                .with_segments(4096, Duration::from_millis(1))
                .stalling_after_first_segment(),
        );
        let plan = quick_plan();

        let result = run_download_phase(transport, &plan, Arc::new(NoopObserver), &silent())
            .await
            .unwrap();

        assert_eq!(result.bytes, 3 * 4096);
        assert_eq!(result.elapsed, plan.duration);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_requests_stop_workers_silently() {
        let transport = Arc::new(FakeTransport::new().failing_downloads());
        let plan = quick_plan();

        let result = run_download_phase(transport.clone(), &plan, Arc::new(NoopObserver), &silent())
            .await
            .unwrap();

        assert_eq!(result.bytes, 0);
        assert_eq!(result.mbps, 0.0);
        assert!(result.elapsed < plan.duration);
        assert_eq!(transport.download_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_broken_body_leaves_other_workers_running() {
        let transport = Arc::new(
            FakeTransport::new()
                .with_segments(1000, Duration::from_millis(10))
                .breaking_download(0, 5, 7),
        );
        let observer = Arc::new(RecordingObserver::default());
        let plan = quick_plan();

        let result = run_download_phase(transport.clone(), &plan, observer.clone(), &silent())
            .await
            .unwrap();

        // The broken worker does not retry; the healthy ones never re-request
        assert_eq!(transport.download_calls(), 3);
        // 35 bytes from the broken body stay in the total
        assert_eq!(result.bytes % 1000, 35);
        assert!(result.bytes >= 35 + 2 * 90 * 1000);
        assert!(result.bytes <= 35 + 2 * 100 * 1000);
        assert!(result.elapsed >= plan.duration);

        let last = observer.updates().into_iter().map(|u| u.elapsed).max().unwrap();
        assert!(last >= Duration::from_millis(900));
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_reports_running_total() {
        let transport = Arc::new(
            FakeTransport::new()
                .with_segments(500, Duration::from_millis(10))
                .with_segments_per_chunk(4),
        );
        let observer = Arc::new(RecordingObserver::default());
        let plan = quick_plan();

        let result = run_download_phase(transport, &plan, observer.clone(), &silent())
            .await
            .unwrap();

        let updates = observer.updates();
        assert!(!updates.is_empty());
        assert!(updates.iter().all(|u| u.phase == Phase::Download && u.mbps.is_finite()));
        assert_eq!(updates.iter().map(|u| u.bytes).max(), Some(result.bytes));
    }
}
