//! Prometheus recorder setup and metric names.

use anyhow::Result;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Counter of handled HTTP requests
pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
/// Histogram of HTTP request latencies
pub const HTTP_REQUESTS_DURATION_SECONDS: &str = "http_requests_duration_seconds";
/// Counter of email and SMS deliveries that failed or timed out
pub const NOTIFICATIONS_FAILED_TOTAL: &str = "notifications_failed_total";
/// Counter of check-ins, labeled by outcome
pub const CHECK_INS_TOTAL: &str = "check_ins_total";

const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Install the global Prometheus recorder and describe all metrics.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(HTTP_REQUESTS_DURATION_SECONDS.to_string()),
            LATENCY_BUCKETS,
        )?
        .install_recorder()?;

    metrics::describe_counter!(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests");
    metrics::describe_histogram!(
        HTTP_REQUESTS_DURATION_SECONDS,
        "HTTP request duration in seconds"
    );
    metrics::describe_counter!(
        NOTIFICATIONS_FAILED_TOTAL,
        "Email and SMS deliveries that failed or timed out"
    );
    metrics::describe_counter!(CHECK_INS_TOTAL, "Check-in attempts by outcome");

    Ok(handle)
}
