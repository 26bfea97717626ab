//! Venue connection and transport retry configuration.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::infrastructure::broker::saxo::{EndpointCategory, RetryPolicy, SaxoEnvironment};

/// Venue connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VenueConfig {
    /// OpenAPI base URL.
    pub base_url: String,
    /// Account orders are booked against.
    pub account_key: String,
    /// Client owning the account.
    pub client_key: String,
    /// Per-request timeout.
    pub request_timeout_secs: u64,
    /// Environment variable holding the bearer token.
    pub access_token_env: String,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            base_url: SaxoEnvironment::Simulation.base_url().to_string(),
            account_key: String::new(),
            client_key: String::new(),
            request_timeout_secs: 30,
            access_token_env: "SAXO_ACCESS_TOKEN".to_string(),
        }
    }
}

impl VenueConfig {
    /// Request timeout as a duration.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Transport retry and throttle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Exponential backoff base.
    pub base_backoff_ms: u64,
    /// Ceiling for every retry delay.
    pub max_backoff_ms: u64,
    /// Floor of the exponential backoff.
    pub min_backoff_ms: u64,
    /// Jitter fraction in [0, 1].
    pub jitter_factor: f64,
    /// Added to a rate-limit reset countdown.
    pub reset_buffer_ms: u64,
    /// Minimum spacing per endpoint category.
    pub min_intervals_ms: HashMap<EndpointCategory, u64>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff_ms: 1000,
            max_backoff_ms: 60_000,
            min_backoff_ms: 1000,
            jitter_factor: 0.5,
            reset_buffer_ms: 1000,
            min_intervals_ms: HashMap::new(),
        }
    }
}

impl TransportConfig {
    /// Build the transport retry policy.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_backoff: Duration::from_millis(self.base_backoff_ms),
            min_backoff: Duration::from_millis(self.min_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            jitter_factor: self.jitter_factor,
            reset_buffer: Duration::from_millis(self.reset_buffer_ms),
        }
    }

    /// Per-category minimum intervals.
    #[must_use]
    pub fn min_intervals(&self) -> HashMap<EndpointCategory, Duration> {
        self.min_intervals_ms
            .iter()
            .map(|(category, ms)| (*category, Duration::from_millis(*ms)))
            .collect()
    }
}
