//! Retry policy for venue requests.
//!
//! # Retryable Responses
//!
//! | Retryable | Never retried |
//! |-----------|---------------|
//! | HTTP 429 (Rate Limited) | HTTP 400 (Bad Request) |
//! | HTTP 500/502/503/504 | HTTP 401/403 (Auth Errors) |
//! | Timeouts, connection resets | Every other status |
//!
//! # Delay priority
//!
//! 1. A numeric `Retry-After` header.
//! 2. The smallest positive `X-RateLimit-*-Reset` value plus a safety buffer.
//! 3. Exponential backoff `base * 2^attempt` with uniform jitter, clamped to
//!    `[min_backoff, max_backoff]`.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::application::ports::RateLimitSnapshot;

/// Retry policy for the venue transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt (default: 3).
    pub max_retries: u32,
    /// Base of the exponential backoff (default: 1s).
    pub base_backoff: Duration,
    /// Floor of the exponential backoff (default: 1s).
    pub min_backoff: Duration,
    /// Ceiling for every computed delay (default: 60s).
    pub max_backoff: Duration,
    /// Jitter as a fraction of the exponential delay (default: 0.5 = ±50%).
    pub jitter_factor: f64,
    /// Added to a rate-limit reset countdown (default: 1s).
    pub reset_buffer: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff: Duration::from_secs(1),
            min_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            jitter_factor: 0.5,
            reset_buffer: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt + 1`.
    #[must_use]
    pub fn compute_delay(
        &self,
        attempt: u32,
        retry_after: Option<Duration>,
        rate_limits: &RateLimitSnapshot,
    ) -> Duration {
        if let Some(delay) = retry_after {
            return delay.min(self.max_backoff);
        }

        if let Some(reset) = rate_limits.min_positive_reset() {
            let delay = Duration::from_secs(reset.unsigned_abs()) + self.reset_buffer;
            return delay.min(self.max_backoff);
        }

        self.exponential_delay(attempt)
    }

    /// Exponential backoff with jitter, clamped to `[min_backoff, max_backoff]`.
    #[must_use]
    pub fn exponential_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(30) as i32;
        let base = self.base_backoff.as_secs_f64() * 2f64.powi(exponent);
        let jitter = self.jitter_factor.clamp(0.0, 1.0);
        let factor = if jitter > 0.0 {
            1.0 + rand::rng().random_range(-jitter..=jitter)
        } else {
            1.0
        };

        let floor = self.min_backoff.as_secs_f64();
        let ceiling = self.max_backoff.as_secs_f64().max(floor);
        Duration::from_secs_f64((base * factor).clamp(floor, ceiling))
    }
}

/// How the transport treats a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 2xx.
    Success,
    /// 429: retried on every request.
    RateLimited,
    /// 500/502/503/504: retried on idempotent requests.
    Retryable,
    /// 401/403: never retried.
    Authentication,
    /// Anything else: never retried.
    NonRetryable,
}

/// Categorize an HTTP status code for retry handling.
#[must_use]
pub const fn classify_status(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Success,
        429 => StatusClass::RateLimited,
        500 | 502 | 503 | 504 => StatusClass::Retryable,
        401 | 403 => StatusClass::Authentication,
        _ => StatusClass::NonRetryable,
    }
}

/// Parse a `Retry-After` value given in (possibly fractional) seconds.
#[must_use]
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let seconds = value.trim().parse::<f64>().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(seconds).ok()
}
