//! Measurement orchestration
//!
//! A run is three phases in order: latency, download, upload. Each transfer
//! phase spawns its workers against one [`TransferWindow`] and sums their
//! bytes through one [`ByteCounter`]. The first phase error ends the run.

pub mod download;
pub mod latency;
pub mod plan;
pub mod progress;
pub mod upload;
pub mod window;

#[cfg(test)]
pub(crate) mod testing;

pub use download::run_download_phase;
pub use latency::run_latency_phase;
pub use plan::SpeedTestPlan;
pub use progress::{NoopObserver, ProgressObserver, ProgressUpdate};
pub use upload::run_upload_phase;
pub use window::{ByteCounter, TransferWindow};

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;

use crate::client::{HttpTransport, SpeedTestTransport};
use crate::error::Result;
use crate::logging::Logger;
use crate::models::{Config, Phase, SpeedTestReport};

/// Result of asking the executor to run
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed(SpeedTestReport),
    /// Another run was in progress; nothing was done
    AlreadyRunning,
}

impl RunOutcome {
    pub fn report(&self) -> Option<&SpeedTestReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::AlreadyRunning => None,
        }
    }
}

/// Runs complete speed tests, at most one at a time
pub struct SpeedTestExecutor {
    transport: Arc<dyn SpeedTestTransport>,
    plan: SpeedTestPlan,
    server_url: String,
    observer: Arc<dyn ProgressObserver>,
    logger: Logger,
    running: AtomicBool,
}

impl SpeedTestExecutor {
    /// Executor for the server named in `config`, with sizes clamped
    pub fn new(config: &Config, logger: Logger) -> Result<Self> {
        let transport = Arc::new(HttpTransport::from_config(config)?);
        Ok(Self::with_transport(transport, SpeedTestPlan::from_config(config), logger)
            .with_server_url(config.server_url.clone()))
    }

    pub fn with_transport(transport: Arc<dyn SpeedTestTransport>, plan: SpeedTestPlan, logger: Logger) -> Self {
        Self {
            transport,
            plan,
            server_url: String::new(),
            observer: Arc::new(NoopObserver),
            logger,
            running: AtomicBool::new(false),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Server URL recorded in reports
    pub fn with_server_url(mut self, server_url: String) -> Self {
        self.server_url = server_url;
        self
    }

    pub fn plan(&self) -> &SpeedTestPlan {
        &self.plan
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run latency, download and upload in sequence.
    ///
    /// Returns [`RunOutcome::AlreadyRunning`] without side effects while
    /// another call is in progress. The guard is released however the run
    /// ends, so a failed run can be retried.
    pub async fn run(&self) -> Result<RunOutcome> {
        let Some(_guard) = RunGuard::acquire(&self.running) else {
            self.logger.debug("Run requested while another is in progress").log().await;
            return Ok(RunOutcome::AlreadyRunning);
        };

        let started_at = Utc::now();

        let latency = self
            .phase(Phase::Latency, run_latency_phase(self.transport.as_ref(), &self.plan, &self.logger))
            .await?;

        let download = self
            .phase(
                Phase::Download,
                run_download_phase(self.transport.clone(), &self.plan, self.observer.clone(), &self.logger),
            )
            .await?;

        let upload = self
            .phase(
                Phase::Upload,
                run_upload_phase(self.transport.clone(), &self.plan, self.observer.clone(), &self.logger),
            )
            .await?;

        Ok(RunOutcome::Completed(SpeedTestReport {
            server_url: self.server_url.clone(),
            started_at,
            completed_at: Utc::now(),
            latency,
            download,
            upload,
        }))
    }

    async fn phase<T, F>(&self, phase: Phase, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let correlation_id = self.logger.start_operation(phase.as_str()).await;
        let result = fut.await;
        self.logger.end_operation(&correlation_id, phase.as_str(), result.is_ok()).await;

        match &result {
            Ok(_) => self.observer.on_phase_complete(phase),
            Err(error) => {
                self.logger
                    .debug(&format!("{} phase failed: {}", phase, error))
                    .correlation_id(&correlation_id)
                    .error_info(error)
                    .log()
                    .await;
            },
        }
        result
    }
}

/// Holds the running flag for the lifetime of one run
struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testing::{FakeTransport, RecordingObserver, quick_plan};

    fn executor(transport: FakeTransport) -> SpeedTestExecutor {
        SpeedTestExecutor::with_transport(Arc::new(transport), quick_plan(), Logger::silent("test".to_string()))
            .with_server_url("http://speed.test".to_string())
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_run_produces_report() {
        let observer = Arc::new(RecordingObserver::default());
        let executor = executor(FakeTransport::new().with_ping_delays(&[5; 7])).with_observer(observer.clone());

        let outcome = executor.run().await.unwrap();
        let report = outcome.report().expect("run should complete");

        assert_eq!(report.server_url, "http://speed.test");
        assert_eq!(report.latency.sample_count(), 7);
        assert_eq!(report.latency.median_ms, 5.0);
        assert!(report.download.bytes > 0);
        assert!(report.upload.bytes > 0);
        assert_eq!(report.download.workers, 3);
        assert_eq!(report.upload.workers, 2);
        assert!(report.completed_at >= report.started_at);

        let updates = observer.updates();
        assert!(updates.iter().any(|u| u.phase == Phase::Download));
        assert!(updates.iter().any(|u| u.phase == Phase::Upload));
        assert!(!executor.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_start_is_ignored() {
        let executor = Arc::new(executor(FakeTransport::new().with_ping_delays(&[50; 7])));

        let first = tokio::spawn({
            let executor = executor.clone();
            async move { executor.run().await }
        });
        while !executor.is_running() {
            tokio::task::yield_now().await;
        }

        let second = executor.run().await.unwrap();
        assert!(matches!(second, RunOutcome::AlreadyRunning));

        let first = first.await.unwrap().unwrap();
        assert!(matches!(first, RunOutcome::Completed(_)));
        assert!(!executor.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_run_releases_guard() {
        let executor = executor(FakeTransport::new().failing_ping_after(0));

        let error = executor.run().await.unwrap_err();
        assert_eq!(error.category(), "NETWORK");
        assert!(!executor.is_running());

        // A retry is attempted rather than ignored
        assert!(executor.run().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_rejection_fails_run() {
        let executor = executor(FakeTransport::new().rejecting_uploads_after(0));

        let error = executor.run().await.unwrap_err();
        assert!(error.to_string().contains("Upload HTTP 500 internal error"));
        assert!(!executor.is_running());
    }

    #[tokio::test]
    async fn test_new_clamps_config() {
        let config = Config {
            parallel: 20,
            duration_secs: 2,
            ..Default::default()
        };
        let executor = SpeedTestExecutor::new(&config, Logger::silent("test".to_string())).unwrap();
        assert_eq!(executor.plan().download_workers, 8);
        assert_eq!(executor.plan().duration.as_secs(), 5);
    }
}
