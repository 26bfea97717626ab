//! Saxo adapter configuration.

use std::collections::HashMap;
use std::time::Duration;

use super::rate_limit::EndpointCategory;
use super::retry::RetryPolicy;

/// Environment for the Saxo OpenAPI gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaxoEnvironment {
    /// Simulation gateway (paper money).
    Simulation,
    /// Live gateway (real money).
    Live,
}

impl SaxoEnvironment {
    /// Get the OpenAPI base URL.
    #[must_use]
    pub const fn base_url(&self) -> &'static str {
        match self {
            Self::Simulation => "https://gateway.saxobank.com/sim/openapi",
            Self::Live => "https://gateway.saxobank.com/openapi",
        }
    }

    /// Check if this is live trading.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }
}

impl std::fmt::Display for SaxoEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simulation => write!(f, "SIM"),
            Self::Live => write!(f, "LIVE"),
        }
    }
}

/// Configuration for the Saxo venue adapter.
#[derive(Debug, Clone)]
pub struct SaxoConfig {
    /// OpenAPI base URL, without a trailing slash.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retry policy for 429, 5xx and network failures.
    pub retry: RetryPolicy,
    /// Minimum spacing between requests of one endpoint category.
    pub min_intervals: HashMap<EndpointCategory, Duration>,
}

impl SaxoConfig {
    /// Create a configuration for a known environment.
    #[must_use]
    pub fn new(environment: SaxoEnvironment) -> Self {
        Self::with_base_url(environment.base_url())
    }

    /// Create a configuration for an explicit base URL.
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            min_intervals: HashMap::new(),
        }
    }

    /// Set the HTTP timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Throttle one endpoint category.
    #[must_use]
    pub fn with_min_interval(mut self, category: EndpointCategory, interval: Duration) -> Self {
        self.min_intervals.insert(category, interval);
        self
    }
}
