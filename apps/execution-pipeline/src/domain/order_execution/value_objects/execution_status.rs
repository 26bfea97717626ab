//! Terminal status of one pipeline invocation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal status reported for an order intention.
///
/// `Success`, `Failure`, and `Uncertain` come from placement and
/// reconciliation. The remaining variants are early rejections raised
/// before anything was sent to the order book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    /// The order is on the book or filled (or the dry run passed every stage).
    Success,
    /// The order definitively did not reach the book.
    Failure,
    /// The venue outcome is unknown; a reconciliation pass is required.
    Uncertain,
    /// Instrument constraints rejected the intention.
    FailedValidation,
    /// The instrument's market state does not permit trading.
    BlockedByMarketState,
    /// A position guard blocked the intention.
    BlockedByPosition,
    /// The dry-run precheck rejected the order.
    FailedPrecheck,
    /// A pre-trade disclaimer is unresolved.
    BlockedByDisclaimer,
    /// The invocation was cancelled or timed out before placement.
    Cancelled,
}

impl ExecutionStatus {
    /// Stable label used in logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Uncertain => "UNCERTAIN",
            Self::FailedValidation => "FAILED_VALIDATION",
            Self::BlockedByMarketState => "BLOCKED_BY_MARKET_STATE",
            Self::BlockedByPosition => "BLOCKED_BY_POSITION",
            Self::FailedPrecheck => "FAILED_PRECHECK",
            Self::BlockedByDisclaimer => "BLOCKED_BY_DISCLAIMER",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Whether the pipeline stopped before any placement attempt.
    #[must_use]
    pub const fn is_early_rejection(&self) -> bool {
        matches!(
            self,
            Self::FailedValidation
                | Self::BlockedByMarketState
                | Self::BlockedByPosition
                | Self::FailedPrecheck
                | Self::BlockedByDisclaimer
                | Self::Cancelled
        )
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
