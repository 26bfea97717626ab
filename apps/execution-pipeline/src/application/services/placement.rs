//! Placement & Reconciliation Client
//!
//! Places the real order and classifies the reply. An ambiguous reply is
//! never treated as a failure: it becomes `Uncertain` and is resolved by
//! querying the venue's order ledger.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::application::ports::{VenueError, VenuePort};
use crate::domain::order_execution::{
    BusinessError, ExternalReference, LedgerOrder, OrderIntention, PlacementOutcome, PrecheckOutcome,
    ReconciliationOutcome,
};
use crate::domain::shared::{ClientKey, OrderId, RequestId};
use crate::observability::record_reconciliation;

/// Business error code the venue uses when an order may or may not have booked.
pub const TRADE_NOT_COMPLETED: &str = "TradeNotCompleted";

/// Placement and reconciliation settings.
#[derive(Debug, Clone)]
pub struct PlacementSettings {
    /// Embedded error codes treated as ambiguous.
    pub ambiguous_codes: HashSet<String>,
    /// Maximum number of recent orders scanned by correlation.
    pub scan_limit: usize,
    /// Orders older than this are ignored by the scan.
    pub max_order_age: Duration,
}

impl Default for PlacementSettings {
    fn default() -> Self {
        Self {
            ambiguous_codes: HashSet::from([TRADE_NOT_COMPLETED.to_string()]),
            scan_limit: 100,
            max_order_age: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Classified placement plus the `x-request-id` it was sent with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementAttempt {
    /// Classified outcome.
    pub outcome: PlacementOutcome,
    /// Request id of the placement call, when one was made and answered.
    pub request_id: Option<RequestId>,
}

impl From<PlacementOutcome> for PlacementAttempt {
    fn from(outcome: PlacementOutcome) -> Self {
        Self {
            outcome,
            request_id: None,
        }
    }
}

/// Places orders and reconciles ambiguous placements.
pub struct PlacementClient<V: VenuePort> {
    venue: Arc<V>,
    settings: PlacementSettings,
}

impl<V: VenuePort> PlacementClient<V> {
    /// Create a client.
    pub const fn new(venue: Arc<V>, settings: PlacementSettings) -> Self {
        Self { venue, settings }
    }

    /// Place an order that passed precheck.
    ///
    /// A failed precheck fails without calling the venue. A dry run
    /// succeeds with the sentinel order id without calling the venue.
    pub async fn place(
        &self,
        intention: &OrderIntention,
        precheck: &PrecheckOutcome,
        dry_run: bool,
    ) -> PlacementAttempt {
        if !precheck.success {
            return PlacementOutcome::Failure {
                code: precheck.error.as_ref().map(|e| e.code.clone()),
                reason: format!("precheck did not succeed: {}", precheck.rejection_reason()),
            }
            .into();
        }

        if dry_run {
            tracing::info!(
                instrument = %intention.instrument(),
                side = %intention.side(),
                quantity = %intention.quantity(),
                "Dry run: skipping order placement"
            );
            return PlacementOutcome::Success {
                order_id: OrderId::dry_run(),
            }
            .into();
        }

        match self.venue.place_order(intention).await {
            Ok(reply) => PlacementAttempt {
                outcome: self.classify_reply(reply.order_id, reply.error),
                request_id: reply.request_id,
            },
            Err(e) => classify_error(&e).into(),
        }
    }

    fn classify_reply(
        &self,
        order_id: Option<OrderId>,
        error: Option<BusinessError>,
    ) -> PlacementOutcome {
        match (order_id, error) {
            (order_id, Some(error)) if self.settings.ambiguous_codes.contains(&error.code) => {
                tracing::warn!(code = %error.code, order_id = ?order_id, "Ambiguous placement reply");
                PlacementOutcome::Uncertain {
                    order_id,
                    reason: error.to_string(),
                }
            }
            (_, Some(error)) => PlacementOutcome::Failure {
                reason: error.to_string(),
                code: Some(error.code),
            },
            (Some(order_id), None) => PlacementOutcome::Success { order_id },
            (None, None) => PlacementOutcome::Uncertain {
                order_id: None,
                reason: "placement reply carried neither an order id nor an error".to_string(),
            },
        }
    }

    /// Resolve an ambiguous placement against the order ledger.
    ///
    /// Looks up `order_id` directly when known, and falls back to scanning
    /// recent orders for `external_reference`.
    pub async fn reconcile(
        &self,
        client_key: &ClientKey,
        order_id: Option<&OrderId>,
        external_reference: &ExternalReference,
    ) -> ReconciliationOutcome {
        let outcome = match self.find_order(client_key, order_id, external_reference).await {
            Ok(Some(order)) => ReconciliationOutcome::from_ledger(&order),
            Ok(None) => ReconciliationOutcome::NotFound,
            Err(e) => ReconciliationOutcome::QueryFailed {
                message: e.to_string(),
            },
        };

        tracing::info!(
            external_reference = %external_reference,
            order_id = ?order_id,
            outcome = outcome.as_str(),
            "Reconciliation finished"
        );
        record_reconciliation(outcome.as_str());
        outcome
    }

    /// Fetch the raw ledger entry for an order.
    ///
    /// # Errors
    ///
    /// Returns the venue error when the ledger cannot be queried.
    pub async fn fetch_ledger_entry(
        &self,
        client_key: &ClientKey,
        order_id: Option<&OrderId>,
        external_reference: &ExternalReference,
    ) -> Result<Option<LedgerOrder>, VenueError> {
        self.find_order(client_key, order_id, external_reference).await
    }

    async fn find_order(
        &self,
        client_key: &ClientKey,
        order_id: Option<&OrderId>,
        external_reference: &ExternalReference,
    ) -> Result<Option<LedgerOrder>, VenueError> {
        if let Some(order_id) = order_id.filter(|id| !id.is_dry_run()) {
            match self.venue.order_by_id(client_key, order_id).await {
                Ok(Some(order)) => return Ok(Some(order)),
                Ok(None) | Err(VenueError::NotFound { .. }) => {
                    tracing::debug!(order_id = %order_id, "Order not found by id, scanning by reference");
                }
                Err(e) => return Err(e),
            }
        }

        let orders = self
            .venue
            .recent_orders(client_key, self.settings.scan_limit)
            .await?;
        let max_age = chrono::Duration::from_std(self.settings.max_order_age)
            .unwrap_or(chrono::Duration::MAX);
        let cutoff = Utc::now().checked_sub_signed(max_age);

        Ok(orders.into_iter().find(|order| {
            order.external_reference.as_deref() == Some(external_reference.as_str())
                && match (order.order_time, cutoff) {
                    (Some(at), Some(cutoff)) => at >= cutoff,
                    _ => true,
                }
        }))
    }
}

/// Classify a transport failure during placement.
///
/// Anything that might have reached the venue is uncertain; definitive
/// client errors are failures.
fn classify_error(error: &VenueError) -> PlacementOutcome {
    let uncertain = match error {
        VenueError::Transient { .. } | VenueError::MalformedResponse { .. } => true,
        VenueError::Remote { status, .. } => *status >= 500,
        VenueError::Authentication { .. }
        | VenueError::Credentials { .. }
        | VenueError::RateLimited { .. }
        | VenueError::NotFound { .. } => false,
    };

    if uncertain {
        tracing::warn!(error = %error, "Placement outcome unknown, reconciliation required");
        PlacementOutcome::Uncertain {
            order_id: None,
            reason: error.to_string(),
        }
    } else {
        tracing::warn!(error = %error, "Placement failed");
        PlacementOutcome::Failure {
            code: Some(error.code()),
            reason: error.to_string(),
        }
    }
}
