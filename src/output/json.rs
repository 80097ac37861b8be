//! Machine-readable report output

use crate::{
    error::Result,
    models::{LatencyResult, SpeedTestReport, ThroughputResult},
};
use super::formatter::ReportFormatter;
use serde_json::json;

/// Formats results as pretty-printed JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl ReportFormatter for JsonFormatter {
    fn format_header(&self, _title: &str) -> Result<String> {
        Ok(String::new())
    }

    fn format_latency(&self, latency: &LatencyResult) -> Result<String> {
        Ok(serde_json::to_string_pretty(latency)?)
    }

    fn format_throughput(&self, result: &ThroughputResult) -> Result<String> {
        Ok(serde_json::to_string_pretty(result)?)
    }

    fn format_report(&self, report: &SpeedTestReport) -> Result<String> {
        let document = json!({
            "server_url": report.server_url,
            "started_at": report.started_at,
            "completed_at": report.completed_at,
            "ping_ms": report.latency.median_ms,
            "download_mbps": report.download.mbps,
            "upload_mbps": report.upload.mbps,
            "latency": report.latency,
            "download": report.download,
            "upload": report.upload,
        });
        Ok(serde_json::to_string_pretty(&document)?)
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(json!({ "error": error }).to_string())
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(json!({ "warning": warning }).to_string())
    }

    fn format_success(&self, message: &str) -> Result<String> {
        Ok(json!({ "message": message }).to_string())
    }
}
