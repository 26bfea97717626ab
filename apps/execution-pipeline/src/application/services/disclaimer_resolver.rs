//! Disclaimer Resolver
//!
//! Fetches disclaimer details (TTL-cached), applies the configured policy,
//! and accepts eligible normal disclaimers. A blocking disclaimer is never
//! accepted and always blocks trading.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::application::cache::TtlCache;
use crate::application::ports::{VenueError, VenuePort};
use crate::domain::disclaimer::{
    DisclaimerPolicy, DisclaimerRecord, ResolutionPlan, plan_resolution,
};
use crate::observability::record_disclaimer_resolution;

/// Default disclaimer cache lifetime.
pub const DISCLAIMER_CACHE_TTL: Duration = Duration::from_secs(300);

/// Result of resolving a precheck's disclaimers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisclaimerResolution {
    /// Whether trading may proceed.
    pub allow_trading: bool,
    /// Tokens classified as blocking (including unfetchable ones).
    pub blocking_tokens: Vec<String>,
    /// Tokens classified as normal.
    pub normal_tokens: Vec<String>,
    /// Tokens accepted by this call.
    pub auto_accepted: Vec<String>,
    /// Fetch and acceptance errors, one line each.
    pub errors: Vec<String>,
    /// Policy applied.
    pub policy: DisclaimerPolicy,
    /// Why trading is blocked, when it is.
    pub block_reason: Option<String>,
}

impl DisclaimerResolution {
    fn allowed(policy: DisclaimerPolicy) -> Self {
        Self {
            allow_trading: true,
            blocking_tokens: Vec::new(),
            normal_tokens: Vec::new(),
            auto_accepted: Vec::new(),
            errors: Vec::new(),
            policy,
            block_reason: None,
        }
    }
}

/// Resolves disclaimers against the venue.
pub struct DisclaimerResolver<V: VenuePort> {
    venue: Arc<V>,
    cache: TtlCache<String, DisclaimerRecord>,
}

impl<V: VenuePort> DisclaimerResolver<V> {
    /// Create a resolver.
    pub fn new(venue: Arc<V>, cache_ttl: Duration) -> Self {
        Self {
            venue,
            cache: TtlCache::new(cache_ttl),
        }
    }

    async fn record(&self, token: &str) -> Result<DisclaimerRecord, VenueError> {
        let key = token.to_string();
        if let Some(record) = self.cache.get(&key) {
            return Ok(record);
        }
        let record = self.venue.disclaimer_details(token).await?;
        self.cache.insert(key, record.clone());
        Ok(record)
    }

    /// Resolve `tokens` under `policy`.
    ///
    /// Unfetchable tokens are treated as blocking. Acceptance stops at the
    /// first failure.
    pub async fn resolve(
        &self,
        tokens: &[String],
        context: &str,
        policy: DisclaimerPolicy,
    ) -> DisclaimerResolution {
        let mut resolution = DisclaimerResolution::allowed(policy);
        if tokens.is_empty() {
            return resolution;
        }

        let mut records = Vec::with_capacity(tokens.len());
        for token in tokens {
            match self.record(token).await {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(token = %token, error = %e, "Disclaimer lookup failed, treating as blocking");
                    resolution.errors.push(format!("{token}: {e}"));
                    records.push(DisclaimerRecord::unavailable(token.clone(), &e.to_string()));
                }
            }
        }

        for record in &records {
            if record.is_blocking {
                resolution.blocking_tokens.push(record.token.clone());
            } else {
                resolution.normal_tokens.push(record.token.clone());
            }
        }

        match plan_resolution(&records, policy) {
            ResolutionPlan::Allow => {}
            ResolutionPlan::Block { reason } => {
                tracing::info!(
                    policy = %policy,
                    blocking = resolution.blocking_tokens.len(),
                    normal = resolution.normal_tokens.len(),
                    reason = %reason,
                    "Disclaimers block trading"
                );
                resolution.allow_trading = false;
                resolution.block_reason = Some(reason);
                record_disclaimer_resolution("blocked");
                return resolution;
            }
            ResolutionPlan::Accept { tokens } => {
                for token in tokens {
                    if let Err(e) = self.venue.accept_disclaimer(context, &token).await {
                        tracing::warn!(token = %token, error = %e, "Disclaimer acceptance failed");
                        resolution.errors.push(format!("{token}: {e}"));
                        resolution.allow_trading = false;
                        resolution.block_reason =
                            Some(format!("failed to accept disclaimer {token}: {e}"));
                        record_disclaimer_resolution("accept_failed");
                        return resolution;
                    }
                    tracing::info!(token = %token, "Disclaimer auto-accepted");
                    resolution.auto_accepted.push(token);
                }
                record_disclaimer_resolution("auto_accepted");
                return resolution;
            }
        }

        record_disclaimer_resolution("allowed");
        resolution
    }

    /// Drop all cached disclaimer records.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::mock::{CallCounts, MockVenue};
    use proptest::prelude::*;

    fn record(token: &str, blocking: bool) -> DisclaimerRecord {
        DisclaimerRecord {
            token: token.to_string(),
            is_blocking: blocking,
            title: format!("{token} title"),
            body: String::new(),
            response_options: vec!["Accepted".to_string(), "Declined".to_string()],
            conditions: Vec::new(),
        }
    }

    fn resolver(venue: &Arc<MockVenue>) -> DisclaimerResolver<MockVenue> {
        DisclaimerResolver::new(Arc::clone(venue), DISCLAIMER_CACHE_TTL)
    }

    fn tokens(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_no_tokens_allows_without_calls() {
        let venue = Arc::new(MockVenue::new());
        let resolution = resolver(&venue)
            .resolve(&[], "ctx", DisclaimerPolicy::BlockAll)
            .await;
        assert!(resolution.allow_trading);
        assert_eq!(CallCounts::get(&venue.calls.disclaimer_details), 0);
    }

    #[tokio::test]
    async fn test_auto_accepts_normal_disclaimers() {
        let venue = Arc::new(MockVenue::new());
        venue.set_disclaimer("d1", Ok(record("d1", false)));
        venue.set_disclaimer("d2", Ok(record("d2", false)));

        let resolution = resolver(&venue)
            .resolve(&tokens(&["d1", "d2"]), "ctx", DisclaimerPolicy::AutoAcceptNormal)
            .await;
        assert!(resolution.allow_trading);
        assert_eq!(resolution.auto_accepted, tokens(&["d1", "d2"]));
        assert_eq!(*venue.accepted_tokens.lock().unwrap(), tokens(&["d1", "d2"]));
    }

    #[tokio::test]
    async fn test_conditions_prevent_any_acceptance() {
        let venue = Arc::new(MockVenue::new());
        let mut conditional = record("d2", false);
        conditional.conditions.push("Confirm risk warning".to_string());
        venue.set_disclaimer("d1", Ok(record("d1", false)));
        venue.set_disclaimer("d2", Ok(conditional));

        let resolution = resolver(&venue)
            .resolve(&tokens(&["d1", "d2"]), "ctx", DisclaimerPolicy::AutoAcceptNormal)
            .await;
        assert!(!resolution.allow_trading);
        assert!(resolution.auto_accepted.is_empty());
        assert_eq!(CallCounts::get(&venue.calls.accept_disclaimer), 0);
    }

    #[tokio::test]
    async fn test_acceptance_failure_blocks() {
        let venue = Arc::new(MockVenue::new());
        venue.set_disclaimer("d1", Ok(record("d1", false)));
        venue.set_disclaimer("d2", Ok(record("d2", false)));
        venue.fail_accept(
            "d1",
            VenueError::Transient {
                message: "timeout".into(),
                timeout: true,
            },
        );

        let resolution = resolver(&venue)
            .resolve(&tokens(&["d1", "d2"]), "ctx", DisclaimerPolicy::AutoAcceptNormal)
            .await;
        assert!(!resolution.allow_trading);
        assert_eq!(resolution.errors.len(), 1);
        assert_eq!(CallCounts::get(&venue.calls.accept_disclaimer), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_blocking_and_not_cached() {
        let venue = Arc::new(MockVenue::new());
        let resolver = resolver(&venue);

        let resolution = resolver
            .resolve(&tokens(&["missing"]), "ctx", DisclaimerPolicy::AutoAcceptNormal)
            .await;
        assert!(!resolution.allow_trading);
        assert_eq!(resolution.blocking_tokens, tokens(&["missing"]));

        resolver
            .resolve(&tokens(&["missing"]), "ctx", DisclaimerPolicy::AutoAcceptNormal)
            .await;
        assert_eq!(CallCounts::get(&venue.calls.disclaimer_details), 2);
    }

    #[tokio::test]
    async fn test_records_are_cached() {
        let venue = Arc::new(MockVenue::new());
        venue.set_disclaimer("d1", Ok(record("d1", false)));
        let resolver = resolver(&venue);

        for _ in 0..3 {
            resolver
                .resolve(&tokens(&["d1"]), "ctx", DisclaimerPolicy::ManualReview)
                .await;
        }
        assert_eq!(CallCounts::get(&venue.calls.disclaimer_details), 1);
    }

    proptest! {
        #[test]
        fn test_any_blocking_disclaimer_blocks_every_policy(
            normal in 0usize..4,
            policy in prop_oneof![
                Just(DisclaimerPolicy::BlockAll),
                Just(DisclaimerPolicy::AutoAcceptNormal),
                Just(DisclaimerPolicy::ManualReview),
            ],
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let venue = Arc::new(MockVenue::new());
            let mut names = vec!["blocker".to_string()];
            venue.set_disclaimer("blocker", Ok(record("blocker", true)));
            for i in 0..normal {
                let token = format!("n{i}");
                venue.set_disclaimer(&token, Ok(record(&token, false)));
                names.push(token);
            }

            let resolution = runtime.block_on(resolver(&venue).resolve(&names, "ctx", policy));
            prop_assert!(!resolution.allow_trading);
            prop_assert_eq!(CallCounts::get(&venue.calls.accept_disclaimer), 0);
        }
    }
}
