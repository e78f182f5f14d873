//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define council metrics (provider calls, breaker state, task quality)
//! - Expose Prometheus-compatible metrics endpoint
//! - Track per-provider and aggregate metrics
//!
//! # Metrics
//! - `council_provider_calls_total` (counter): calls by provider, outcome
//! - `council_call_duration_seconds` (histogram): provider call latency
//! - `council_breaker_state` (gauge): 0=closed, 1=open, 2=half-open
//! - `council_provider_health` (gauge): 1=healthy, 0=unhealthy
//! - `council_tasks_total` (counter): council tasks by workflow, outcome
//! - `council_quality_score` (histogram): task quality score distribution
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Labels for provider, outcome, workflow
//! - Exporter failure is logged, never fatal

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on the given address.
///
/// Failure to bind is logged and ignored; the service runs without metrics
/// rather than refusing to start.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record the outcome of one provider call made through a breaker.
pub fn record_provider_call(provider: &str, outcome: &str, start: Instant) {
    counter!(
        "council_provider_calls_total",
        "provider" => provider.to_string(),
        "outcome" => outcome.to_string(),
    )
    .increment(1);
    histogram!(
        "council_call_duration_seconds",
        "provider" => provider.to_string(),
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record a breaker state transition (0=closed, 1=open, 2=half-open).
pub fn record_breaker_state(provider: &str, state: u8) {
    gauge!(
        "council_breaker_state",
        "provider" => provider.to_string(),
    )
    .set(state as f64);
}

/// Record a provider health probe result.
pub fn record_provider_health(provider: &str, healthy: bool) {
    gauge!(
        "council_provider_health",
        "provider" => provider.to_string(),
    )
    .set(if healthy { 1.0 } else { 0.0 });
}

/// Record a completed council task.
pub fn record_council_task(workflow: &str, optimization_applied: bool, score: u8, start: Instant) {
    let outcome = if optimization_applied { "optimized" } else { "fallback" };
    counter!(
        "council_tasks_total",
        "workflow" => workflow.to_string(),
        "outcome" => outcome,
    )
    .increment(1);
    histogram!("council_quality_score").record(score as f64);
    histogram!(
        "council_task_duration_seconds",
        "workflow" => workflow.to_string(),
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record current pool composition after init or reset.
pub fn record_pool_size(admitted: usize, failed: usize) {
    gauge!("council_pool_providers", "status" => "ready").set(admitted as f64);
    gauge!("council_pool_providers", "status" => "failed").set(failed as f64);
}
