//! Measurement results produced by the three test phases

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use chrono::{DateTime, Utc};

/// The three sequential phases of a speed test run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Latency,
    Download,
    Upload,
}

impl Phase {
    /// Human-readable phase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Latency => "latency",
            Phase::Download => "download",
            Phase::Upload => "upload",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptive statistics over round-trip samples
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatencySummary {
    pub min_ms: f64,
    pub max_ms: f64,
    pub mean_ms: f64,
    pub median_ms: f64,
    /// 90th percentile, linearly interpolated
    #[serde(default)]
    pub p90_ms: f64,
    /// Mean absolute difference between consecutive samples
    pub jitter_ms: f64,
}

/// Outcome of the latency phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencyResult {
    /// Round-trip times in the order they were measured
    pub samples_ms: Vec<f64>,
    /// Reported metric
    pub median_ms: f64,
    pub summary: LatencySummary,
}

impl LatencyResult {
    /// Number of probes that completed
    pub fn sample_count(&self) -> usize {
        self.samples_ms.len()
    }

    /// Raw samples formatted with one decimal, comma separated
    pub fn format_samples(&self) -> String {
        self.samples_ms
            .iter()
            .map(|s| format!("{:.1}", s))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Outcome of a download or upload phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThroughputResult {
    pub phase: Phase,
    /// Total bytes counted inside the transfer window
    pub bytes: u64,
    /// Wall-clock time from the first worker start to the last worker exit
    pub elapsed: Duration,
    /// Reported metric, megabits per second
    pub mbps: f64,
    /// Number of workers that took part
    pub workers: usize,
    pub started_at: DateTime<Utc>,
}

impl ThroughputResult {
    /// Elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }

    /// One-line summary in the form used by the run log
    pub fn summary_line(&self) -> String {
        let label = match self.phase {
            Phase::Download => "Download",
            Phase::Upload => "Upload",
            Phase::Latency => "Latency",
        };
        format!(
            "{}: {} bytes in {:.0}ms => {:.2} Mbps",
            label,
            self.bytes,
            self.elapsed_ms(),
            self.mbps
        )
    }
}

/// Full report of one completed run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeedTestReport {
    pub server_url: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub latency: LatencyResult,
    pub download: ThroughputResult,
    pub upload: ThroughputResult,
}

impl SpeedTestReport {
    /// Total run time
    pub fn total_duration(&self) -> chrono::Duration {
        self.completed_at - self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn throughput(phase: Phase) -> ThroughputResult {
        ThroughputResult {
            phase,
            bytes: 1_000_000,
            elapsed: Duration::from_millis(1000),
            mbps: 8.0,
            workers: 4,
            started_at: Utc::now(),
        }
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Download.to_string(), "download");
        assert_eq!(serde_json::to_string(&Phase::Upload).unwrap(), "\"upload\"");
    }

    #[test]
    fn test_summary_line() {
        assert_eq!(
            throughput(Phase::Download).summary_line(),
            "Download: 1000000 bytes in 1000ms => 8.00 Mbps"
        );
        assert!(throughput(Phase::Upload).summary_line().starts_with("Upload:"));
    }

    #[test]
    fn test_format_samples() {
        let result = LatencyResult {
            samples_ms: vec![12.34, 9.0, 15.06],
            median_ms: 12.34,
            summary: LatencySummary::default(),
        };
        assert_eq!(result.format_samples(), "12.3, 9.0, 15.1");
        assert_eq!(result.sample_count(), 3);
    }
}
