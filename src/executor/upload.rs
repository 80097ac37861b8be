//! Upload phase: parallel workers posting one shared payload until the
//! window closes

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use futures::future::join_all;

use crate::client::SpeedTestTransport;
use crate::error::{AppError, Result};
use crate::logging::Logger;
use crate::models::{Phase, ThroughputResult};
use crate::{stats, traffic};

use super::progress::{ProgressObserver, ProgressUpdate};
use super::window::{ByteCounter, TransferWindow};
use super::SpeedTestPlan;

struct UploadWorker {
    transport: Arc<dyn SpeedTestTransport>,
    window: TransferWindow,
    counter: ByteCounter,
    observer: Arc<dyn ProgressObserver>,
    payload: Bytes,
}

impl UploadWorker {
    async fn run(self) -> Result<()> {
        let payload_len = self.payload.len() as u64;

        while self.window.is_open() {
            match self.window.guard(self.transport.upload(self.payload.clone())).await {
                None => break,
                Some(Ok(receipt)) => {
                    let total = self.counter.add(receipt.received.unwrap_or(payload_len));
                    self.observer
                        .on_progress(ProgressUpdate::new(Phase::Upload, total, self.window.elapsed()));
                },
                Some(Err(e)) => {
                    // Stop every other worker before reporting
                    self.window.cancel();
                    return Err(e);
                },
            }
        }
        Ok(())
    }
}

/// Run `plan.upload_workers` workers that repeatedly send the same random
/// payload until the deadline. Each completed upload adds the byte count the
/// server reported, or the payload length when it reported none.
///
/// Unlike downloads, the first failed upload fails the whole phase: the
/// remaining workers are halted and the error is returned.
pub async fn run_upload_phase(
    transport: Arc<dyn SpeedTestTransport>,
    plan: &SpeedTestPlan,
    observer: Arc<dyn ProgressObserver>,
    logger: &Logger,
) -> Result<ThroughputResult> {
    // Generated before the window opens so its cost is not timed
    let payload = traffic::random_payload(plan.payload_size);

    let counter = ByteCounter::new();
    let started_at = Utc::now();
    let window = TransferWindow::open(plan.duration);

    let workers = (0..plan.upload_workers).map(|_| {
        let worker = UploadWorker {
            transport: transport.clone(),
            window: window.clone(),
            counter: counter.clone(),
            observer: observer.clone(),
            payload: payload.clone(),
        };
        tokio::spawn(worker.run())
    });

    let mut first_error: Option<AppError> = None;
    for joined in join_all(workers).await {
        let outcome = joined.map_err(AppError::from).and_then(|result| result);
        if let Err(error) = outcome {
            first_error.get_or_insert(error);
        }
    }

    if let Some(error) = first_error {
        logger
            .debug(&format!("Upload phase halted: {}", error))
            .error_info(&error)
            .field("bytes_before_failure", counter.total())
            .log()
            .await;
        return Err(error);
    }

    let elapsed = window.elapsed();
    let bytes = counter.total();
    let result = ThroughputResult {
        phase: Phase::Upload,
        bytes,
        elapsed,
        mbps: stats::throughput_mbps(bytes, elapsed),
        workers: plan.upload_workers,
        started_at,
    };

    logger.info(&result.summary_line()).throughput(&result).log().await;

    Ok(result)
}
