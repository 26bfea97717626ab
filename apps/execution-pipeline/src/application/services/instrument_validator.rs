//! Instrument Validator
//!
//! Fetches per-instrument trading constraints through the venue port,
//! caches them with a TTL, and checks intentions against them.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::application::cache::TtlCache;
use crate::application::ports::{VenueError, VenuePort};
use crate::domain::instrument::{InstrumentConstraints, ValidationRejection};
use crate::domain::order_execution::OrderIntention;
use crate::domain::shared::{AccountKey, InstrumentKey};

/// Default constraint cache lifetime.
pub const INSTRUMENT_CACHE_TTL: Duration = Duration::from_secs(600);

type ConstraintKey = (InstrumentKey, Option<AccountKey>);

/// Validation failure: either a rejection or a fatal venue defect.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    /// The intention does not satisfy the constraints (or they could not be
    /// fetched, which fails closed).
    #[error(transparent)]
    Rejected(#[from] ValidationRejection),
    /// A setup defect surfaced while fetching constraints.
    #[error("instrument lookup failed fatally: {0}")]
    Fatal(VenueError),
}

/// Validates intentions against cached instrument constraints.
pub struct InstrumentValidator<V: VenuePort> {
    venue: Arc<V>,
    cache: TtlCache<ConstraintKey, InstrumentConstraints>,
}

impl<V: VenuePort> InstrumentValidator<V> {
    /// Create a validator with the given cache lifetime.
    pub fn new(venue: Arc<V>, cache_ttl: Duration) -> Self {
        Self {
            venue,
            cache: TtlCache::new(cache_ttl),
        }
    }

    /// Constraints for an instrument, from cache or the venue.
    pub async fn constraints(
        &self,
        instrument: &InstrumentKey,
        account_key: Option<&AccountKey>,
    ) -> Result<InstrumentConstraints, VenueError> {
        let key = (*instrument, account_key.cloned());
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let constraints = self
            .venue
            .instrument_details(instrument, account_key)
            .await?;
        tracing::debug!(
            instrument = %instrument,
            tradable = constraints.tradable,
            market_state = ?constraints.market_state,
            "Cached instrument constraints"
        );
        self.cache.insert(key, constraints.clone());
        Ok(constraints)
    }

    /// Validate an intention. Lookup failures reject, except fatal ones.
    pub async fn validate(&self, intention: &OrderIntention) -> Result<(), ValidationError> {
        let constraints = match self
            .constraints(intention.instrument(), Some(intention.account_key()))
            .await
        {
            Ok(c) => c,
            Err(e) if e.is_fatal() => return Err(ValidationError::Fatal(e)),
            Err(VenueError::NotFound { .. }) => {
                return Err(ValidationRejection::InstrumentNotFound.into());
            }
            Err(e) => {
                tracing::warn!(
                    instrument = %intention.instrument(),
                    error = %e,
                    "Instrument lookup failed, rejecting"
                );
                return Err(ValidationRejection::LookupFailed {
                    message: e.to_string(),
                }
                .into());
            }
        };

        constraints.validate(intention).map_err(|rejection| {
            tracing::info!(
                instrument = %intention.instrument(),
                reason = %rejection,
                "Intention failed instrument validation"
            );
            ValidationError::Rejected(rejection)
        })
    }

    /// Drop the cached constraints for an instrument (all accounts).
    pub fn invalidate(&self, instrument: &InstrumentKey, account_key: Option<&AccountKey>) {
        self.cache.invalidate(&(*instrument, account_key.cloned()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::RateLimitSnapshot;
    use crate::application::ports::mock::{CallCounts, MockVenue};
    use crate::domain::instrument::MarketState;
    use crate::domain::order_execution::OrderSide;
    use crate::domain::shared::{AssetType, ClientKey, Quantity};
    use rust_decimal_macros::dec;

    fn key() -> InstrumentKey {
        InstrumentKey::new(AssetType::Stock, 211)
    }

    fn intention(amount: rust_decimal::Decimal) -> OrderIntention {
        OrderIntention::market(
            AccountKey::new("acc"),
            ClientKey::new("cli"),
            key(),
            OrderSide::Buy,
            Quantity::new(amount).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_constraints_are_cached() {
        let venue = Arc::new(MockVenue::new());
        let validator = InstrumentValidator::new(Arc::clone(&venue), INSTRUMENT_CACHE_TTL);

        validator.validate(&intention(dec!(1))).await.unwrap();
        validator.validate(&intention(dec!(2))).await.unwrap();
        assert_eq!(CallCounts::get(&venue.calls.instrument_details), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_constraints_are_refetched() {
        let venue = Arc::new(MockVenue::new());
        let validator = InstrumentValidator::new(Arc::clone(&venue), Duration::from_secs(600));

        validator.validate(&intention(dec!(1))).await.unwrap();
        tokio::time::advance(Duration::from_secs(601)).await;
        validator.validate(&intention(dec!(1))).await.unwrap();
        assert_eq!(CallCounts::get(&venue.calls.instrument_details), 2);
    }

    #[tokio::test]
    async fn test_closed_market_rejects() {
        let venue = Arc::new(MockVenue::new());
        venue.set_constraints(
            key(),
            Ok(InstrumentConstraints::minimal(
                key(),
                true,
                Some(MarketState::Closed),
            )),
        );
        let validator = InstrumentValidator::new(venue, INSTRUMENT_CACHE_TTL);

        let err = validator.validate(&intention(dec!(1))).await.unwrap_err();
        let ValidationError::Rejected(rejection) = err else {
            panic!("expected rejection, got {err:?}");
        };
        assert!(rejection.is_market_state());
    }

    #[tokio::test]
    async fn test_lookup_failure_fails_closed() {
        let venue = Arc::new(MockVenue::new());
        venue.set_constraints(
            key(),
            Err(VenueError::Remote {
                status: 503,
                code: None,
                message: "unavailable".to_string(),
                rate_limits: RateLimitSnapshot::default(),
            }),
        );
        let validator = InstrumentValidator::new(Arc::clone(&venue), INSTRUMENT_CACHE_TTL);

        let err = validator.validate(&intention(dec!(1))).await.unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Rejected(ValidationRejection::LookupFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_not_found_and_fatal_errors() {
        let venue = Arc::new(MockVenue::new());
        venue.set_constraints(
            key(),
            Err(VenueError::NotFound {
                what: "instrument".to_string(),
            }),
        );
        let validator = InstrumentValidator::new(Arc::clone(&venue), INSTRUMENT_CACHE_TTL);
        assert!(matches!(
            validator.validate(&intention(dec!(1))).await,
            Err(ValidationError::Rejected(ValidationRejection::InstrumentNotFound))
        ));

        venue.set_constraints(key(), Err(VenueError::Authentication { status: 401 }));
        assert!(matches!(
            validator.validate(&intention(dec!(1))).await,
            Err(ValidationError::Fatal(_))
        ));
    }
}
