//! Clamped measurement parameters for one run

use std::time::Duration;

use crate::defaults::{
    MAX_PARALLEL, MAX_UPLOAD_MB, MEBIBYTE, MIN_CHUNK_MB, MIN_DURATION_SECS, MIN_PARALLEL, MIN_UPLOAD_MB, MIN_UPLOAD_WORKERS,
};
use crate::models::Config;

/// Parameters the phases actually run with.
///
/// Built from a [`Config`] with every size clamped into its safe range; the
/// fields are public so tests can drive phases with short windows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeedTestPlan {
    /// Number of latency probes
    pub ping_count: u32,
    /// Pause between consecutive probes
    pub ping_interval: Duration,
    /// Length of each transfer window
    pub duration: Duration,
    pub download_workers: usize,
    /// Bytes requested per download
    pub chunk_size: u64,
    pub upload_workers: usize,
    /// Bytes sent per upload
    pub payload_size: u64,
}

impl SpeedTestPlan {
    pub fn from_config(config: &Config) -> Self {
        let download_workers = clamp_parallel(config.parallel);

        Self {
            ping_count: config.ping_count.max(1),
            ping_interval: config.ping_interval(),
            duration: Duration::from_secs(clamp_duration_secs(config.duration_secs)),
            download_workers,
            chunk_size: clamp_chunk_mb(config.chunk_mb).saturating_mul(MEBIBYTE),
            upload_workers: upload_worker_count(download_workers),
            payload_size: clamp_upload_mb(config.upload_mb) * MEBIBYTE,
        }
    }
}

pub fn clamp_duration_secs(secs: u64) -> u64 {
    secs.max(MIN_DURATION_SECS)
}

pub fn clamp_parallel(parallel: usize) -> usize {
    parallel.clamp(MIN_PARALLEL, MAX_PARALLEL)
}

pub fn clamp_chunk_mb(chunk_mb: u64) -> u64 {
    chunk_mb.max(MIN_CHUNK_MB)
}

pub fn clamp_upload_mb(upload_mb: u64) -> u64 {
    upload_mb.clamp(MIN_UPLOAD_MB, MAX_UPLOAD_MB)
}

/// Upload concurrency for a download concurrency: two thirds, rounded down,
/// never fewer than two
pub fn upload_worker_count(parallel: usize) -> usize {
    (parallel * 2 / 3).max(MIN_UPLOAD_WORKERS)
}
