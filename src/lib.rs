//! Network Speed Tester
//!
//! Measures latency, download throughput and upload throughput between a
//! client and a cooperating HTTP server. The server half generates and
//! swallows synthetic traffic; the client half drives three timed phases
//! with pools of concurrent workers and reduces the raw samples into a report.

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod models;
pub mod output;
pub mod server;
pub mod stats;
pub mod traffic;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use executor::{SpeedTestExecutor, SpeedTestPlan, RunOutcome, ByteCounter, TransferWindow};
pub use models::{Config, LatencyResult, ThroughputResult, SpeedTestReport};
pub use server::SpeedTestServer;
pub use client::{HttpTransport, SpeedTestTransport};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Default configuration values and measurement bounds
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";
    pub const DEFAULT_HOST: &str = "0.0.0.0";
    pub const DEFAULT_PORT: u16 = 3000;

    pub const DEFAULT_DURATION_SECS: u64 = 10;
    pub const DEFAULT_PARALLEL: usize = 4;
    pub const DEFAULT_CHUNK_MB: u64 = 20;
    pub const DEFAULT_UPLOAD_MB: u64 = 2;
    pub const DEFAULT_PING_COUNT: u32 = 7;
    pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_millis(100);
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_ENABLE_COLOR: bool = true;

    pub const MIN_DURATION_SECS: u64 = 5;
    pub const MIN_PARALLEL: usize = 1;
    pub const MAX_PARALLEL: usize = 8;
    pub const MIN_CHUNK_MB: u64 = 5;
    pub const MIN_UPLOAD_MB: u64 = 1;
    /// The upload payload is held in memory for the whole phase
    pub const MAX_UPLOAD_MB: u64 = 1024;
    pub const MIN_UPLOAD_WORKERS: usize = 2;

    pub const MEBIBYTE: u64 = 1024 * 1024;
}
