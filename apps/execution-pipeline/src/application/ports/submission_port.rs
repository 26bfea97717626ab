//! Submission Repository Port (Driven Port)
//!
//! Records the outcome of each non-dry-run execution by correlation
//! string, so a repeated Execute never places the same trade twice.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::order_execution::{ExecutionStatus, ExternalReference, OrderIntention, OrderSide};
use crate::domain::shared::{ClientKey, InstrumentKey, OrderId};

/// The trade a correlation string was used for.
///
/// A correlation string may only be replayed for the same instrument,
/// side, and requested quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentionFingerprint {
    /// Instrument.
    pub instrument: InstrumentKey,
    /// Side.
    pub side: OrderSide,
    /// Requested quantity, before any guard clamping.
    pub quantity: Decimal,
}

impl IntentionFingerprint {
    /// Fingerprint of an intention as requested.
    #[must_use]
    pub fn of(intention: &OrderIntention) -> Self {
        Self {
            instrument: *intention.instrument(),
            side: intention.side(),
            quantity: intention.quantity().amount(),
        }
    }
}

/// Last known outcome for one correlation string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    /// Correlation string.
    pub external_reference: ExternalReference,
    /// Client the order belongs to.
    pub client_key: ClientKey,
    /// What was submitted under the correlation string.
    pub fingerprint: IntentionFingerprint,
    /// Last status.
    pub status: ExecutionStatus,
    /// Venue order id, when known.
    pub order_id: Option<OrderId>,
    /// When the record was written.
    pub recorded_at: DateTime<Utc>,
}

impl SubmissionRecord {
    /// Whether this record forbids placing again under its correlation
    /// string: the order is on the book, or may be.
    #[must_use]
    pub const fn holds_reference(&self) -> bool {
        matches!(
            self.status,
            ExecutionStatus::Success | ExecutionStatus::Uncertain
        )
    }
}

/// Result of trying to take a correlation string for a placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionClaim {
    /// The record was written; the caller owns the placement.
    Acquired,
    /// Another submission holds the correlation string.
    Held(SubmissionRecord),
}

/// Repository errors.
#[derive(Debug, Clone, Error)]
pub enum SubmissionStoreError {
    /// Backing store failed.
    #[error("submission store unavailable: {0}")]
    Unavailable(String),
}

/// Store of submission outcomes.
#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    /// Last record for a correlation string.
    async fn find(
        &self,
        external_reference: &ExternalReference,
    ) -> Result<Option<SubmissionRecord>, SubmissionStoreError>;

    /// Insert or replace the record for its correlation string.
    async fn save(&self, record: SubmissionRecord) -> Result<(), SubmissionStoreError>;

    /// Atomically write `record` unless the existing record for its
    /// correlation string [holds it](SubmissionRecord::holds_reference).
    ///
    /// Exactly one of several concurrent claims for the same correlation
    /// string gets [`SubmissionClaim::Acquired`].
    async fn claim(
        &self,
        record: SubmissionRecord,
    ) -> Result<SubmissionClaim, SubmissionStoreError>;
}
