//! Execution result DTO

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::order_execution::{ExecutionStatus, ReconciliationOutcome};
use crate::domain::position::GuardReason;
use crate::domain::shared::{Money, OrderId, RequestId};

/// Outcome of one `Execute` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    /// Terminal status.
    pub status: ExecutionStatus,
    /// Venue order id (or the dry-run sentinel).
    pub order_id: Option<OrderId>,
    /// Human-readable reason for every non-success status.
    pub error_message: Option<String>,
    /// Placement was ambiguous; reconciliation was (or must be) run.
    pub needs_reconciliation: bool,
    /// Result of the reconciliation pass, when one ran.
    pub reconciliation: Option<ReconciliationOutcome>,
    /// Correlation string the order was (or would be) placed with.
    pub external_reference: Option<String>,
    /// `x-request-id` of the last venue call that shaped the outcome.
    pub request_id: Option<RequestId>,
    /// Precheck cost estimate.
    pub estimated_cost: Option<Money>,
    /// Precheck margin estimate.
    pub margin_impact: Option<Money>,
    /// Guard reason, when a guard ran.
    pub guard_reason: Option<GuardReason>,
    /// The invocation ran in dry-run mode.
    pub dry_run: bool,
    /// When the result was produced.
    pub timestamp: DateTime<Utc>,
}

impl ExecutionResult {
    /// A result with the given status and nothing else set.
    #[must_use]
    pub fn new(status: ExecutionStatus) -> Self {
        Self {
            status,
            order_id: None,
            error_message: None,
            needs_reconciliation: false,
            reconciliation: None,
            external_reference: None,
            request_id: None,
            estimated_cost: None,
            margin_impact: None,
            guard_reason: None,
            dry_run: false,
            timestamp: Utc::now(),
        }
    }

    /// An early rejection with a reason.
    #[must_use]
    pub fn rejected(status: ExecutionStatus, reason: impl Into<String>) -> Self {
        Self {
            error_message: Some(reason.into()),
            ..Self::new(status)
        }
    }

    /// Whether the order is known to be on the book (or the dry run passed).
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }
}
