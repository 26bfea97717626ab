//! Position Tracker & Guards
//!
//! Keeps a TTL-cached view of the client's net positions and evaluates buy
//! and sell eligibility against it. A failed refresh keeps serving the last
//! known positions and flags the failure so guards can fail closed.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::application::ports::VenuePort;
use crate::domain::position::{
    GuardDecision, GuardPolicy, GuardReason, PositionMap, evaluate_buy, evaluate_sell,
    index_positions,
};
use crate::domain::shared::{ClientKey, InstrumentKey, Quantity};

/// Default position cache lifetime.
pub const POSITIONS_CACHE_TTL: Duration = Duration::from_secs(30);

/// Positions as last seen, plus whether the latest refresh failed.
#[derive(Debug, Clone, Default)]
pub struct PositionSnapshot {
    /// Positions by instrument.
    pub positions: PositionMap,
    /// The latest refresh attempt failed; `positions` may be stale or empty.
    pub last_query_failed: bool,
}

#[derive(Default)]
struct TrackerState {
    snapshot: PositionSnapshot,
    fetched_at: Option<Instant>,
}

/// Cached view of one client's net positions.
pub struct PositionTracker<V: VenuePort> {
    venue: Arc<V>,
    client_key: ClientKey,
    ttl: Duration,
    state: RwLock<TrackerState>,
    refresh: Mutex<()>,
}

impl<V: VenuePort> PositionTracker<V> {
    /// Create a tracker for the session's client.
    pub fn new(venue: Arc<V>, client_key: ClientKey, ttl: Duration) -> Self {
        Self {
            venue,
            client_key,
            ttl,
            state: RwLock::new(TrackerState::default()),
            refresh: Mutex::new(()),
        }
    }

    /// Client whose positions are tracked.
    pub const fn client_key(&self) -> &ClientKey {
        &self.client_key
    }

    fn fresh_snapshot(&self) -> Option<PositionSnapshot> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        match state.fetched_at {
            Some(at) if at.elapsed() < self.ttl && !state.snapshot.last_query_failed => {
                Some(state.snapshot.clone())
            }
            _ => None,
        }
    }

    /// Current positions, refreshing when stale or when forced.
    ///
    /// Never fails: a refresh error keeps the previous positions and sets
    /// `last_query_failed`.
    pub async fn get_positions(&self, force_refresh: bool) -> PositionSnapshot {
        if !force_refresh {
            if let Some(snapshot) = self.fresh_snapshot() {
                return snapshot;
            }
        }

        // One refresh at a time; waiters reuse the result.
        let _guard = self.refresh.lock().await;
        if !force_refresh {
            if let Some(snapshot) = self.fresh_snapshot() {
                return snapshot;
            }
        }

        let result = self.venue.net_positions(&self.client_key).await;
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        match result {
            Ok(rows) => {
                state.snapshot = PositionSnapshot {
                    positions: index_positions(rows),
                    last_query_failed: false,
                };
                state.fetched_at = Some(Instant::now());
                tracing::debug!(
                    client_key = %self.client_key,
                    positions = state.snapshot.positions.len(),
                    "Refreshed net positions"
                );
            }
            Err(e) => {
                state.snapshot.last_query_failed = true;
                tracing::warn!(
                    client_key = %self.client_key,
                    error = %e,
                    cached = state.snapshot.positions.len(),
                    "Position refresh failed, serving last known positions"
                );
            }
        }
        state.snapshot.clone()
    }

    /// Mark the cache stale so the next read refetches.
    pub fn invalidate(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.fetched_at = None;
    }
}

/// Buy/sell guards backed by a [`PositionTracker`].
pub struct PositionGuards<V: VenuePort> {
    tracker: Arc<PositionTracker<V>>,
    policy: GuardPolicy,
}

impl<V: VenuePort> PositionGuards<V> {
    /// Create guards with the given policy.
    pub const fn new(tracker: Arc<PositionTracker<V>>, policy: GuardPolicy) -> Self {
        Self { tracker, policy }
    }

    /// Underlying tracker.
    pub fn tracker(&self) -> Arc<PositionTracker<V>> {
        Arc::clone(&self.tracker)
    }

    /// Evaluate a buy.
    pub async fn evaluate_buy(&self, instrument: &InstrumentKey, quantity: Quantity) -> GuardDecision {
        let snapshot = self.tracker.get_positions(false).await;
        let decision = evaluate_buy(
            &self.policy,
            snapshot.positions.get(instrument),
            snapshot.last_query_failed,
        );

        if decision.reason == GuardReason::DuplicateBuyWarned {
            tracing::warn!(
                instrument = %instrument,
                quantity = %quantity,
                held = ?decision.position_quantity,
                "Buying into an existing long position"
            );
        }
        decision
    }

    /// Evaluate a sell; `None` closes the full position.
    pub async fn evaluate_sell(
        &self,
        instrument: &InstrumentKey,
        requested: Option<Quantity>,
    ) -> GuardDecision {
        let snapshot = self.tracker.get_positions(false).await;
        let decision = evaluate_sell(
            snapshot.positions.get(instrument),
            snapshot.last_query_failed,
            requested.map(|q| q.amount()),
        );

        if decision.reason == GuardReason::SellQuantityClamped {
            tracing::warn!(
                instrument = %instrument,
                requested = ?requested.map(|q| q.amount()),
                approved = ?decision.approved_quantity,
                "Sell quantity clamped to held position"
            );
        }
        decision
    }
}
