//! Prometheus metrics for the execution pipeline.
//!
//! Counters and gauges for execution results, transport retries, venue
//! rate-limit headroom, disclaimer resolutions, and reconciliations.
//!
//! # Example
//!
//! ```ignore
//! use execution_pipeline::observability::{init_metrics, MetricsConfig};
//!
//! init_metrics(&MetricsConfig::default())?;
//! record_execution_result("SUCCESS", 0.420);
//! ```

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Configuration for the metrics exporter.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP listener.
    pub listen_addr: SocketAddr,
    /// Histogram buckets for pipeline duration (in seconds).
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 9090)),
            // 10ms to 2 minutes; placement plus retries can take a while
            duration_buckets: vec![
                0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0,
            ],
        }
    }
}

impl MetricsConfig {
    /// Create a new metrics configuration with custom address.
    #[must_use]
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            listen_addr: addr,
            ..Default::default()
        }
    }
}

/// Initialize the Prometheus metrics exporter.
///
/// This starts an HTTP server that exposes metrics at `/metrics`.
///
/// # Errors
///
/// Returns an error if the metrics exporter fails to start (e.g., port already in use).
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .set_buckets(&config.duration_buckets)
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(
        addr = %config.listen_addr,
        "Prometheus metrics exporter started"
    );

    Ok(())
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure metrics exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

// ============================================================================
// Pipeline Metrics
// ============================================================================

/// Record one finished pipeline invocation.
///
/// # Arguments
///
/// * `status` - Final execution status label (e.g., "SUCCESS", "UNCERTAIN")
/// * `duration_seconds` - Wall time of the invocation
pub fn record_execution_result(status: &str, duration_seconds: f64) {
    counter!("execution_results_total", "status" => status.to_string()).increment(1);
    histogram!("execution_duration_seconds", "status" => status.to_string())
        .record(duration_seconds);
}

/// Record a disclaimer resolution (`allowed`, `blocked`, `auto_accepted`, `accept_failed`).
pub fn record_disclaimer_resolution(outcome: &str) {
    counter!("disclaimer_resolutions_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record a reconciliation outcome (e.g., `found_filled`, `not_found`).
pub fn record_reconciliation(outcome: &str) {
    counter!("reconciliations_total", "outcome" => outcome.to_string()).increment(1);
}

// ============================================================================
// Transport Metrics
// ============================================================================

/// Record a transport-level retry.
///
/// # Arguments
///
/// * `category` - Endpoint category (e.g., "orders", "ref_data")
/// * `reason` - What triggered the retry (e.g., "http_429", "timeout")
pub fn record_transport_retry(category: &str, reason: &str) {
    counter!(
        "transport_retries_total",
        "category" => category.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Update the remaining quota reported for one rate-limit dimension.
pub fn update_rate_limit_remaining(category: &str, dimension: &str, remaining: i64) {
    #[allow(clippy::cast_precision_loss)]
    gauge!(
        "rate_limit_remaining",
        "category" => category.to_string(),
        "dimension" => dimension.to_string()
    )
    .set(remaining as f64);
}

// ============================================================================
// Tests
// ============================================================================
