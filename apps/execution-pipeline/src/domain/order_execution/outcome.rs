//! Placement and reconciliation outcomes, and how they combine into the
//! final status.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::ledger::LedgerOrder;
use crate::domain::order_execution::value_objects::ExecutionStatus;
use crate::domain::shared::OrderId;

/// Result of the placement call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PlacementOutcome {
    /// The venue accepted the order and returned its id.
    Success {
        /// Venue order id (the sentinel for dry runs).
        order_id: OrderId,
    },
    /// The order definitively did not reach the book.
    Failure {
        /// Error code, when the venue or transport supplied one.
        code: Option<String>,
        /// Human-readable reason.
        reason: String,
    },
    /// The venue may or may not have booked the order.
    Uncertain {
        /// Order id, if the venue returned one.
        order_id: Option<OrderId>,
        /// Why the outcome is ambiguous.
        reason: String,
    },
}

impl PlacementOutcome {
    /// Whether reconciliation is required.
    #[must_use]
    pub const fn needs_reconciliation(&self) -> bool {
        matches!(self, Self::Uncertain { .. })
    }

    /// Order id carried by the outcome, if any.
    #[must_use]
    pub const fn order_id(&self) -> Option<&OrderId> {
        match self {
            Self::Success { order_id } => Some(order_id),
            Self::Uncertain { order_id, .. } => order_id.as_ref(),
            Self::Failure { .. } => None,
        }
    }

    /// Reason text for non-success outcomes.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { reason, .. } | Self::Uncertain { reason, .. } => Some(reason),
        }
    }
}

/// Result of querying the ledger for an ambiguous placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconciliationOutcome {
    /// The order is live on the book.
    FoundWorking {
        /// Venue order id.
        order_id: OrderId,
    },
    /// The order filled.
    FoundFilled {
        /// Venue order id.
        order_id: OrderId,
        /// Filled amount, when reported.
        filled_amount: Option<Decimal>,
        /// Fill price, when reported.
        fill_price: Option<Decimal>,
    },
    /// The order was cancelled or rejected.
    FoundCancelled {
        /// Venue order id.
        order_id: OrderId,
        /// Venue status string.
        status: String,
    },
    /// No order matches the id or correlation string.
    NotFound,
    /// The ledger could not be queried.
    QueryFailed {
        /// Error description.
        message: String,
    },
}

impl ReconciliationOutcome {
    /// Map a ledger row to an outcome.
    ///
    /// Unknown statuses map to `FoundWorking`: an order we cannot classify
    /// is assumed live rather than lost.
    #[must_use]
    pub fn from_ledger(order: &LedgerOrder) -> Self {
        let order_id = order.order_id.clone();
        match order.status.as_str() {
            "Filled" | "FillAndStore" => Self::FoundFilled {
                order_id,
                filled_amount: order.filled_amount,
                fill_price: order.price,
            },
            "Cancelled" | "Rejected" => Self::FoundCancelled {
                order_id,
                status: order.status.clone(),
            },
            _ => Self::FoundWorking { order_id },
        }
    }

    /// Stable label used in logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FoundWorking { .. } => "found_working",
            Self::FoundFilled { .. } => "found_filled",
            Self::FoundCancelled { .. } => "found_cancelled",
            Self::NotFound => "not_found",
            Self::QueryFailed { .. } => "query_failed",
        }
    }

    /// Order id discovered by reconciliation, if any.
    #[must_use]
    pub const fn order_id(&self) -> Option<&OrderId> {
        match self {
            Self::FoundWorking { order_id }
            | Self::FoundFilled { order_id, .. }
            | Self::FoundCancelled { order_id, .. } => Some(order_id),
            Self::NotFound | Self::QueryFailed { .. } => None,
        }
    }
}

/// Authoritative pipeline result once placement (and reconciliation) ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinalExecutionStatus {
    /// The order is on the book or filled.
    Success,
    /// The order is not on the book.
    Failure,
    /// Still unknown; needs a later reconciliation pass.
    Uncertain,
}

/// Combine placement and reconciliation into the final status.
///
/// An uncertain placement that was never reconciled stays uncertain.
#[must_use]
pub const fn derive_final_status(
    placement: &PlacementOutcome,
    reconciliation: Option<&ReconciliationOutcome>,
) -> FinalExecutionStatus {
    match placement {
        PlacementOutcome::Success { .. } => FinalExecutionStatus::Success,
        PlacementOutcome::Failure { .. } => FinalExecutionStatus::Failure,
        PlacementOutcome::Uncertain { .. } => match reconciliation {
            Some(outcome) => resolve_reconciliation(outcome),
            None => FinalExecutionStatus::Uncertain,
        },
    }
}

/// Final status implied by a reconciliation outcome alone.
#[must_use]
pub const fn resolve_reconciliation(outcome: &ReconciliationOutcome) -> FinalExecutionStatus {
    match outcome {
        ReconciliationOutcome::FoundWorking { .. } | ReconciliationOutcome::FoundFilled { .. } => {
            FinalExecutionStatus::Success
        }
        ReconciliationOutcome::FoundCancelled { .. } | ReconciliationOutcome::NotFound => {
            FinalExecutionStatus::Failure
        }
        ReconciliationOutcome::QueryFailed { .. } => FinalExecutionStatus::Uncertain,
    }
}

impl From<FinalExecutionStatus> for ExecutionStatus {
    fn from(status: FinalExecutionStatus) -> Self {
        match status {
            FinalExecutionStatus::Success => Self::Success,
            FinalExecutionStatus::Failure => Self::Failure,
            FinalExecutionStatus::Uncertain => Self::Uncertain,
        }
    }
}
