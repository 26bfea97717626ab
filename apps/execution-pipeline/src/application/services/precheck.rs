//! Precheck Client
//!
//! Submits a non-binding dry run of the order. Business rejections and
//! transport failures both come back as a rejected [`PrecheckOutcome`];
//! only setup defects (credentials, authentication, malformed responses)
//! surface as errors.

use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::{VenueError, VenuePort};
use crate::domain::order_execution::{BusinessError, OrderIntention, PrecheckOutcome};

/// Retry settings for the whole precheck call.
#[derive(Debug, Clone, Copy)]
pub struct PrecheckRetry {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before retry `n` is `backoff_base * 2^n`.
    pub backoff_base: Duration,
}

impl Default for PrecheckRetry {
    fn default() -> Self {
        Self {
            max_retries: 1,
            backoff_base: Duration::from_secs(2),
        }
    }
}

impl PrecheckRetry {
    fn delay(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2_u32.saturating_pow(attempt))
    }
}

/// Runs prechecks against the venue.
pub struct PrecheckClient<V: VenuePort> {
    venue: Arc<V>,
    retry: PrecheckRetry,
}

impl<V: VenuePort> PrecheckClient<V> {
    /// Create a client.
    pub const fn new(venue: Arc<V>, retry: PrecheckRetry) -> Self {
        Self { venue, retry }
    }

    /// Precheck an intention.
    ///
    /// # Errors
    ///
    /// Returns the venue error when it is fatal.
    pub async fn execute(&self, intention: &OrderIntention) -> Result<PrecheckOutcome, VenueError> {
        let mut attempt = 0;
        loop {
            match self.venue.precheck_order(intention).await {
                Ok(outcome) => {
                    if outcome.success {
                        tracing::debug!(
                            instrument = %intention.instrument(),
                            cost = ?outcome.estimated_cost,
                            disclaimers = outcome.disclaimer_tokens().len(),
                            "Precheck accepted"
                        );
                    } else {
                        tracing::info!(
                            instrument = %intention.instrument(),
                            reason = %outcome.rejection_reason(),
                            "Precheck rejected by venue"
                        );
                    }
                    return Ok(outcome);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay(attempt);
                    tracing::warn!(
                        instrument = %intention.instrument(),
                        attempt = attempt + 1,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "Transient precheck failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        instrument = %intention.instrument(),
                        error = %e,
                        "Precheck failed at transport level"
                    );
                    return Ok(PrecheckOutcome::rejected(BusinessError::new(
                        e.code(),
                        e.to_string(),
                    )));
                }
            }
        }
    }
}
