//! Latency phase: sequential round-trip probes reduced to a median

use tokio::time::{Instant, sleep};

use crate::client::SpeedTestTransport;
use crate::error::Result;
use crate::logging::Logger;
use crate::models::LatencyResult;
use crate::stats;

use super::SpeedTestPlan;

/// Send `plan.ping_count` probes one after another, pausing
/// `plan.ping_interval` between them, and report the median round trip.
///
/// Any probe failure ends the phase with that error.
pub async fn run_latency_phase(
    transport: &dyn SpeedTestTransport,
    plan: &SpeedTestPlan,
    logger: &Logger,
) -> Result<LatencyResult> {
    let mut samples = Vec::with_capacity(plan.ping_count as usize);

    for probe in 0..plan.ping_count {
        if probe > 0 && !plan.ping_interval.is_zero() {
            sleep(plan.ping_interval).await;
        }

        let sent = Instant::now();
        transport.ping().await?;
        let rtt_ms = sent.elapsed().as_nanos() as f64 / 1e6;

        logger
            .trace(&format!("Ping {}/{}: {:.1}ms", probe + 1, plan.ping_count, rtt_ms))
            .field("rtt_ms", rtt_ms)
            .log()
            .await;
        samples.push(rtt_ms);
    }

    let summary = stats::summarize_latency(&samples)?;
    let result = LatencyResult {
        median_ms: summary.median_ms,
        samples_ms: samples,
        summary,
    };

    logger
        .info(&format!("Ping samples (ms): {}", result.format_samples()))
        .latency(&result)
        .log()
        .await;

    Ok(result)
}
