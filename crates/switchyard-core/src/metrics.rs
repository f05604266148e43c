//! Prometheus metrics for the Switchyard gateway.
//!
//! - `switchyard_requests_total{outcome}` - Counter of finished completion requests
//! - `switchyard_cache_lookups_total{result}` - Counter of cache lookups (hit/miss)
//! - `switchyard_provider_duration_seconds{model}` - Histogram of provider dispatch time
//! - `switchyard_usage_cost_micro_usd_total{model}` - Counter of estimated spend in micro-USD
//! - `switchyard_uptime_seconds` - Gauge of server uptime
//!
//! Recording before [`init_metrics`] is a no-op.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use crate::error::{AppError, AppResult};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

static METRICS_START_TIME: OnceLock<Instant> = OnceLock::new();

/// LLM latency is bimodal: sub-second for short prompts, tens of seconds for long generations.
const PROVIDER_LATENCY_BUCKETS: &[f64] = &[0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0];

/// Install the Prometheus recorder. Later calls return the existing handle.
pub fn init_metrics() -> AppResult<PrometheusHandle> {
    let _ = METRICS_START_TIME.get_or_init(Instant::now);

    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets(PROVIDER_LATENCY_BUCKETS)
        .map_err(|e| AppError::Telemetry(format!("Failed to set histogram buckets: {}", e)))?
        .install_recorder()
        .map_err(|e| AppError::Telemetry(format!("Failed to install metrics recorder: {}", e)))?;

    describe_counter!("switchyard_requests_total", "Completion requests by outcome");
    describe_counter!("switchyard_cache_lookups_total", "Response cache lookups by result");
    describe_histogram!(
        "switchyard_provider_duration_seconds",
        "Provider dispatch duration in seconds"
    );
    describe_counter!(
        "switchyard_usage_cost_micro_usd_total",
        "Estimated spend in millionths of a USD by model"
    );
    describe_gauge!("switchyard_uptime_seconds", "Server uptime in seconds");

    let _ = PROMETHEUS_HANDLE.set(handle.clone());
    Ok(handle)
}

/// `outcome` is `completed`, `cache_hit`, or a rejection kind.
pub fn record_request(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!("switchyard_requests_total", &labels).increment(1);
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("switchyard_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_provider_duration(model: &str, elapsed: Duration) {
    let labels = [("model", model.to_string())];
    histogram!("switchyard_provider_duration_seconds", &labels).record(elapsed.as_secs_f64());
}

pub fn record_cost(model: &str, cost_usd: f64) {
    if cost_usd <= 0.0 {
        return;
    }
    let labels = [("model", model.to_string())];
    counter!("switchyard_usage_cost_micro_usd_total", &labels)
        .increment((cost_usd * 1_000_000.0).round() as u64);
}

pub fn update_uptime_gauge() {
    if let Some(start) = METRICS_START_TIME.get() {
        gauge!("switchyard_uptime_seconds").set(start.elapsed().as_secs_f64());
    }
}

/// Render all metrics in Prometheus text format.
pub fn render_metrics() -> String {
    update_uptime_gauge();

    match PROMETHEUS_HANDLE.get() {
        Some(handle) => handle.render(),
        None => String::from("# Metrics not initialized\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_request("completed");
        record_cache_lookup(true);
        record_provider_duration("m1", Duration::from_millis(120));
        record_cost("m1", 0.25);
        record_cost("m1", 0.0);
    }

    #[test]
    fn test_render_before_init() {
        if PROMETHEUS_HANDLE.get().is_none() {
            assert!(render_metrics().starts_with("# Metrics not initialized"));
        }
    }
}
