//! In-process transport and observer doubles for phase tests

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream;
use tokio::time::sleep;

use crate::client::{DownloadBody, SpeedTestTransport, UploadReceipt};
use crate::error::{AppError, Result};
use crate::server::PingResponse;

use super::progress::{ProgressObserver, ProgressUpdate};
use super::SpeedTestPlan;

/// Plan with one-second windows and small sizes
pub fn quick_plan() -> SpeedTestPlan {
    SpeedTestPlan {
        ping_count: 7,
        ping_interval: Duration::from_millis(100),
        duration: Duration::from_secs(1),
        download_workers: 3,
        chunk_size: 1024 * 1024,
        upload_workers: 2,
        payload_size: 64 * 1024,
    }
}

/// Scriptable transport. Timings use tokio's clock so tests can run with
/// paused time.
#[derive(Default)]
pub struct FakeTransport {
    ping_delays: Mutex<VecDeque<u64>>,
    ping_fail_after: Option<usize>,
    segment_len: usize,
    segment_delay: Duration,
    segments_per_chunk: Option<usize>,
    stall_after_first: bool,
    fail_downloads: bool,
    /// (call index, segment count, segment length) of a body that errors out
    broken_download: Option<(usize, usize, usize)>,
    upload_delay: Duration,
    upload_receipt: Option<u64>,
    reject_uploads_after: Option<usize>,
    ping_calls: AtomicUsize,
    download_calls: AtomicUsize,
    upload_calls: AtomicUsize,
    last_upload_len: AtomicUsize,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            segment_len: 1024,
            segment_delay: Duration::from_millis(10),
            upload_delay: Duration::from_millis(10),
            ..Default::default()
        }
    }

    /// Successive probes take these many milliseconds; later ones are instant
    pub fn with_ping_delays(self, delays_ms: &[u64]) -> Self {
        *self.ping_delays.lock().unwrap() = delays_ms.iter().copied().collect();
        self
    }

    /// Probes after the first `successes` fail
    pub fn failing_ping_after(mut self, successes: usize) -> Self {
        self.ping_fail_after = Some(successes);
        self
    }

    pub fn with_segments(mut self, len: usize, delay: Duration) -> Self {
        self.segment_len = len;
        self.segment_delay = delay;
        self
    }

    /// Bodies end after `count` segments instead of running forever
    pub fn with_segments_per_chunk(mut self, count: usize) -> Self {
        self.segments_per_chunk = Some(count);
        self
    }

    /// Bodies deliver one segment and then never another
    pub fn stalling_after_first_segment(mut self) -> Self {
        self.stall_after_first = true;
        self
    }

    pub fn failing_downloads(mut self) -> Self {
        self.fail_downloads = true;
        self
    }

    /// Download call number `call` (0-based) delivers `segments` segments of
    /// `len` bytes and then fails mid-body; other calls behave normally
    pub fn breaking_download(mut self, call: usize, segments: usize, len: usize) -> Self {
        self.broken_download = Some((call, segments, len));
        self
    }

    pub fn with_upload_delay(mut self, delay: Duration) -> Self {
        self.upload_delay = delay;
        self
    }

    pub fn with_upload_receipt(mut self, received: Option<u64>) -> Self {
        self.upload_receipt = received;
        self
    }

    /// Uploads after the first `successes` are answered with HTTP 500
    pub fn rejecting_uploads_after(mut self, successes: usize) -> Self {
        self.reject_uploads_after = Some(successes);
        self
    }

    pub fn ping_calls(&self) -> usize {
        self.ping_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn last_upload_len(&self) -> usize {
        self.last_upload_len.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeedTestTransport for FakeTransport {
    async fn ping(&self) -> Result<PingResponse> {
        let call = self.ping_calls.fetch_add(1, Ordering::SeqCst);
        if self.ping_fail_after.is_some_and(|successes| call >= successes) {
            return Err(AppError::network("Connection refused"));
        }

        let delay = self.ping_delays.lock().unwrap().pop_front().unwrap_or(0);
        sleep(Duration::from_millis(delay)).await;
        Ok(PingResponse { t: 0 })
    }

    async fn download(&self, _size: u64) -> Result<DownloadBody> {
        let call = self.download_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_downloads {
            return Err(AppError::http_request("Download HTTP 503"));
        }

        let delay = self.segment_delay;
        if let Some((broken_call, count, len)) = self.broken_download {
            if call == broken_call {
                let segment = Bytes::from(vec![0u8; len]);
                let body = stream::iter((0..count).map(move |_| segment.clone()))
                    .then(move |segment| async move {
                        sleep(delay).await;
                        Ok::<Bytes, AppError>(segment)
                    })
                    .chain(stream::once(async { Err(AppError::network("connection reset")) }));
                return Ok(body.boxed());
            }
        }

        let segment = Bytes::from(vec![0u8; self.segment_len]);
        let segments = stream::unfold((), move |_| {
            let segment = segment.clone();
            async move {
                sleep(delay).await;
                Some((Ok::<Bytes, AppError>(segment), ()))
            }
        });

        let body: DownloadBody = if self.stall_after_first {
            segments.take(1).chain(stream::pending()).boxed()
        } else if let Some(count) = self.segments_per_chunk {
            segments.take(count).boxed()
        } else {
            segments.boxed()
        };
        Ok(body)
    }

    async fn upload(&self, payload: Bytes) -> Result<UploadReceipt> {
        let call = self.upload_calls.fetch_add(1, Ordering::SeqCst);
        self.last_upload_len.store(payload.len(), Ordering::SeqCst);
        sleep(self.upload_delay).await;

        if self.reject_uploads_after.is_some_and(|successes| call >= successes) {
            return Err(AppError::upload_rejected(500, "internal error"));
        }
        Ok(UploadReceipt {
            received: self.upload_receipt,
        })
    }
}

/// Observer that keeps every update
#[derive(Default)]
pub struct RecordingObserver {
    updates: Mutex<Vec<ProgressUpdate>>,
}

impl RecordingObserver {
    pub fn updates(&self) -> Vec<ProgressUpdate> {
        self.updates.lock().unwrap().clone()
    }
}

impl ProgressObserver for RecordingObserver {
    fn on_progress(&self, update: ProgressUpdate) {
        self.updates.lock().unwrap().push(update);
    }
}
