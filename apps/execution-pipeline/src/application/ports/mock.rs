//! Hand-written venue double shared by the service and use case tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{PlacementReply, VenueError, VenuePort};
use crate::domain::disclaimer::DisclaimerRecord;
use crate::domain::instrument::{InstrumentConstraints, MarketState};
use crate::domain::order_execution::{LedgerOrder, OrderIntention, PrecheckOutcome};
use crate::domain::position::Position;
use crate::domain::shared::{AccountKey, ClientKey, InstrumentKey, OrderId};

#[derive(Debug, Default)]
pub struct CallCounts {
    pub instrument_details: AtomicUsize,
    pub net_positions: AtomicUsize,
    pub precheck: AtomicUsize,
    pub disclaimer_details: AtomicUsize,
    pub accept_disclaimer: AtomicUsize,
    pub place_order: AtomicUsize,
    pub order_by_id: AtomicUsize,
    pub recent_orders: AtomicUsize,
}

impl CallCounts {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// Scriptable venue. Unscripted calls answer with permissive defaults:
/// open tradable instruments, no positions, accepted prechecks, and
/// placements returning order id `1`.
#[derive(Default)]
pub struct MockVenue {
    pub calls: CallCounts,
    constraints: Mutex<HashMap<InstrumentKey, Result<InstrumentConstraints, VenueError>>>,
    positions: Mutex<VecDeque<Result<Vec<Position>, VenueError>>>,
    prechecks: Mutex<VecDeque<Result<PrecheckOutcome, VenueError>>>,
    disclaimers: Mutex<HashMap<String, Result<DisclaimerRecord, VenueError>>>,
    accept_failures: Mutex<HashMap<String, VenueError>>,
    placements: Mutex<VecDeque<Result<PlacementReply, VenueError>>>,
    placement_delay: Mutex<Option<Duration>>,
    ledger: Mutex<HashMap<OrderId, LedgerOrder>>,
    recent: Mutex<Option<Result<Vec<LedgerOrder>, VenueError>>>,
    pub accepted_tokens: Mutex<Vec<String>>,
    pub placed_quantities: Mutex<Vec<rust_decimal::Decimal>>,
}

impl MockVenue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_constraints(
        &self,
        instrument: InstrumentKey,
        result: Result<InstrumentConstraints, VenueError>,
    ) {
        self.constraints.lock().unwrap().insert(instrument, result);
    }

    /// Queue a positions reply; the last queued reply repeats.
    pub fn push_positions(&self, result: Result<Vec<Position>, VenueError>) {
        self.positions.lock().unwrap().push_back(result);
    }

    pub fn push_precheck(&self, result: Result<PrecheckOutcome, VenueError>) {
        self.prechecks.lock().unwrap().push_back(result);
    }

    pub fn set_disclaimer(&self, token: &str, result: Result<DisclaimerRecord, VenueError>) {
        self.disclaimers
            .lock()
            .unwrap()
            .insert(token.to_string(), result);
    }

    pub fn fail_accept(&self, token: &str, error: VenueError) {
        self.accept_failures
            .lock()
            .unwrap()
            .insert(token.to_string(), error);
    }

    pub fn push_placement(&self, result: Result<PlacementReply, VenueError>) {
        self.placements.lock().unwrap().push_back(result);
    }

    pub fn set_placement_delay(&self, delay: Duration) {
        *self.placement_delay.lock().unwrap() = Some(delay);
    }

    pub fn add_ledger_order(&self, order: LedgerOrder) {
        self.ledger
            .lock()
            .unwrap()
            .insert(order.order_id.clone(), order);
    }

    pub fn set_recent_orders(&self, result: Result<Vec<LedgerOrder>, VenueError>) {
        *self.recent.lock().unwrap() = Some(result);
    }

    pub fn open_constraints(instrument: InstrumentKey) -> InstrumentConstraints {
        InstrumentConstraints::minimal(instrument, true, Some(MarketState::Open))
    }
}

#[async_trait]
impl VenuePort for MockVenue {
    async fn instrument_details(
        &self,
        instrument: &InstrumentKey,
        _account_key: Option<&AccountKey>,
    ) -> Result<InstrumentConstraints, VenueError> {
        self.calls.instrument_details.fetch_add(1, Ordering::SeqCst);
        self.constraints
            .lock()
            .unwrap()
            .get(instrument)
            .cloned()
            .unwrap_or_else(|| Ok(Self::open_constraints(*instrument)))
    }

    async fn net_positions(&self, _client_key: &ClientKey) -> Result<Vec<Position>, VenueError> {
        self.calls.net_positions.fetch_add(1, Ordering::SeqCst);
        let mut queue = self.positions.lock().unwrap();
        if queue.len() > 1 {
            return queue.pop_front().unwrap();
        }
        queue.front().cloned().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn precheck_order(
        &self,
        _order: &OrderIntention,
    ) -> Result<PrecheckOutcome, VenueError> {
        self.calls.precheck.fetch_add(1, Ordering::SeqCst);
        self.prechecks
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(PrecheckOutcome::accepted(None, None, None)))
    }

    async fn disclaimer_details(&self, token: &str) -> Result<DisclaimerRecord, VenueError> {
        self.calls.disclaimer_details.fetch_add(1, Ordering::SeqCst);
        self.disclaimers
            .lock()
            .unwrap()
            .get(token)
            .cloned()
            .unwrap_or_else(|| {
                Err(VenueError::NotFound {
                    what: format!("disclaimer {token}"),
                })
            })
    }

    async fn accept_disclaimer(&self, _context: &str, token: &str) -> Result<(), VenueError> {
        self.calls.accept_disclaimer.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.accept_failures.lock().unwrap().get(token) {
            return Err(err.clone());
        }
        self.accepted_tokens.lock().unwrap().push(token.to_string());
        Ok(())
    }

    async fn place_order(&self, order: &OrderIntention) -> Result<PlacementReply, VenueError> {
        self.calls.place_order.fetch_add(1, Ordering::SeqCst);
        self.placed_quantities
            .lock()
            .unwrap()
            .push(order.quantity().amount());
        let delay = *self.placement_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.placements.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(PlacementReply {
                order_id: Some(OrderId::new("1")),
                error: None,
                request_id: None,
            })
        })
    }

    async fn order_by_id(
        &self,
        _client_key: &ClientKey,
        order_id: &OrderId,
    ) -> Result<Option<LedgerOrder>, VenueError> {
        self.calls.order_by_id.fetch_add(1, Ordering::SeqCst);
        Ok(self.ledger.lock().unwrap().get(order_id).cloned())
    }

    async fn recent_orders(
        &self,
        _client_key: &ClientKey,
        limit: usize,
    ) -> Result<Vec<LedgerOrder>, VenueError> {
        self.calls.recent_orders.fetch_add(1, Ordering::SeqCst);
        match self.recent.lock().unwrap().clone() {
            Some(Ok(mut orders)) => {
                orders.truncate(limit);
                Ok(orders)
            }
            Some(Err(e)) => Err(e),
            None => Ok(Vec::new()),
        }
    }
}
