//! Observability module for metrics.
//!
//! Prometheus counters and gauges for the pipeline and the venue transport.
//! Log and trace setup lives in [`crate::telemetry`].

mod metrics;

pub use metrics::{
    MetricsConfig, MetricsError, init_metrics, record_disclaimer_resolution,
    record_execution_result, record_reconciliation, record_transport_retry,
    update_rate_limit_remaining,
};
