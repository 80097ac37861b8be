//! Core formatting traits and the plain text implementation

use crate::{
    error::{AppError, Result},
    models::{LatencyResult, SpeedTestReport, ThroughputResult},
};
use std::fmt::Write as _;

/// Renders speed test results for the console
pub trait ReportFormatter: Send + Sync {
    /// Format a header section
    fn format_header(&self, title: &str) -> Result<String>;

    /// Format the latency phase result
    fn format_latency(&self, latency: &LatencyResult) -> Result<String>;

    /// Format one transfer phase result
    fn format_throughput(&self, result: &ThroughputResult) -> Result<String>;

    /// Format the complete report
    fn format_report(&self, report: &SpeedTestReport) -> Result<String> {
        let mut output = String::new();
        output.push_str(&self.format_header("Network Speed Test Results")?);
        output.push_str("\n\n");
        output.push_str(&self.format_latency(&report.latency)?);
        output.push('\n');
        output.push_str(&self.format_throughput(&report.download)?);
        output.push('\n');
        output.push_str(&self.format_throughput(&report.upload)?);
        Ok(output)
    }

    fn format_error(&self, error: &str) -> Result<String>;

    fn format_warning(&self, warning: &str) -> Result<String>;

    fn format_success(&self, message: &str) -> Result<String>;
}

/// Configuration options for formatting
#[derive(Debug, Clone)]
pub struct FormattingOptions {
    pub enable_color: bool,
    /// Show raw samples and byte counts
    pub verbose_mode: bool,
    /// Width of the label column
    pub label_width: usize,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            enable_color: true,
            verbose_mode: false,
            label_width: 10,
        }
    }
}

/// Format duration in human-readable form
pub fn format_duration(duration_ms: f64) -> String {
    if duration_ms < 1.0 {
        format!("{:.2}μs", duration_ms * 1000.0)
    } else if duration_ms < 1000.0 {
        format!("{:.1}ms", duration_ms)
    } else if duration_ms < 60000.0 {
        format!("{:.2}s", duration_ms / 1000.0)
    } else {
        let minutes = (duration_ms / 60000.0) as u32;
        let seconds = (duration_ms % 60000.0) / 1000.0;
        format!("{}m{:.1}s", minutes, seconds)
    }
}

/// Byte count with a binary unit
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

pub(crate) fn fmt_err(e: std::fmt::Error) -> AppError {
    AppError::io(format!("Failed to format output: {}", e))
}

/// Plain text formatter implementation
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }

    fn label(&self, label: &str) -> String {
        format!("{:<width$}", format!("{}:", label), width = self.options.label_width)
    }
}

impl ReportFormatter for PlainFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let mut output = String::new();
        let border = "=".repeat(title.len() + 4);

        writeln!(output, "{}", border).map_err(fmt_err)?;
        writeln!(output, "  {}  ", title).map_err(fmt_err)?;
        write!(output, "{}", border).map_err(fmt_err)?;

        Ok(output)
    }

    fn format_latency(&self, latency: &LatencyResult) -> Result<String> {
        let mut output = String::new();

        writeln!(output, "{} {:.1} ms", self.label("Ping"), latency.median_ms).map_err(fmt_err)?;
        if self.options.verbose_mode {
            writeln!(output, "{} {}", self.label("Samples"), latency.format_samples()).map_err(fmt_err)?;
            writeln!(
                output,
                "{} min {:.1} / p90 {:.1} / max {:.1} / jitter {:.1} ms",
                self.label("Spread"),
                latency.summary.min_ms,
                latency.summary.p90_ms,
                latency.summary.max_ms,
                latency.summary.jitter_ms
            )
            .map_err(fmt_err)?;
        }

        Ok(output)
    }

    fn format_throughput(&self, result: &ThroughputResult) -> Result<String> {
        let mut output = String::new();
        let label = match result.phase {
            crate::models::Phase::Download => "Download",
            crate::models::Phase::Upload => "Upload",
            crate::models::Phase::Latency => "Latency",
        };

        writeln!(output, "{} {:.2} Mbps", self.label(label), result.mbps).map_err(fmt_err)?;
        if self.options.verbose_mode {
            writeln!(
                output,
                "{} {} in {} over {} workers",
                self.label(""),
                format_bytes(result.bytes),
                format_duration(result.elapsed_ms()),
                result.workers
            )
            .map_err(fmt_err)?;
        }

        Ok(output)
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("ERROR: {}", error))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("WARNING: {}", warning))
    }

    fn format_success(&self, message: &str) -> Result<String> {
        Ok(format!("SUCCESS: {}", message))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{LatencySummary, Phase};
    use chrono::Utc;
    use std::time::Duration;

    pub(crate) fn sample_report() -> SpeedTestReport {
        let throughput = |phase, bytes, workers| ThroughputResult {
            phase,
            bytes,
            elapsed: Duration::from_secs(10),
            mbps: crate::stats::throughput_mbps(bytes, Duration::from_secs(10)),
            workers,
            started_at: Utc::now(),
        };

        SpeedTestReport {
            server_url: "http://127.0.0.1:3000".to_string(),
            started_at: Utc::now(),
            completed_at: Utc::now(),
            latency: LatencyResult {
                samples_ms: vec![12.0, 10.5, 11.0],
                median_ms: 11.0,
                summary: LatencySummary {
                    min_ms: 10.5,
                    max_ms: 12.0,
                    mean_ms: 11.166,
                    median_ms: 11.0,
                    p90_ms: 11.8,
                    jitter_ms: 1.0,
                },
            },
            download: throughput(Phase::Download, 125_000_000, 4),
            upload: throughput(Phase::Upload, 25_000_000, 2),
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.5), "500.00μs");
        assert_eq!(format_duration(12.34), "12.3ms");
        assert_eq!(format_duration(10_000.0), "10.00s");
        assert_eq!(format_duration(90_000.0), "1m30.0s");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(20 * 1024 * 1024), "20.0 MiB");
    }

    #[test]
    fn test_plain_report() {
        let formatter = PlainFormatter::new(FormattingOptions {
            enable_color: false,
            ..Default::default()
        });
        let output = formatter.format_report(&sample_report()).unwrap();

        assert!(output.contains("Network Speed Test Results"));
        assert!(output.contains("Ping:      11.0 ms"));
        assert!(output.contains("Download:  100.00 Mbps"));
        assert!(output.contains("Upload:    20.00 Mbps"));
        assert!(!output.contains("Samples"));
    }

    #[test]
    fn test_plain_report_verbose() {
        let formatter = PlainFormatter::new(FormattingOptions {
            enable_color: false,
            verbose_mode: true,
            ..Default::default()
        });
        let output = formatter.format_report(&sample_report()).unwrap();

        assert!(output.contains("12.0, 10.5, 11.0"));
        assert!(output.contains("p90 11.8"));
        assert!(output.contains("over 4 workers"));
        assert!(output.contains("10.00s"));
    }

    #[test]
    fn test_plain_messages() {
        let formatter = PlainFormatter::new(FormattingOptions::default());
        assert_eq!(formatter.format_error("boom").unwrap(), "ERROR: boom");
        assert_eq!(formatter.format_warning("careful").unwrap(), "WARNING: careful");
    }
}
