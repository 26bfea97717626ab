//! Venue Port (Driven Port)
//!
//! Interface for every remote read and write the pipeline makes against
//! the brokerage venue. Implementations parse venue responses strictly and
//! hand back domain types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::domain::disclaimer::DisclaimerRecord;
use crate::domain::instrument::InstrumentConstraints;
use crate::domain::order_execution::{
    BusinessError, LedgerOrder, OrderIntention, PrecheckOutcome,
};
use crate::domain::position::Position;
use crate::domain::shared::{AccountKey, ClientKey, InstrumentKey, OrderId, RequestId};

// ============================================================================
// Rate Limit Snapshot
// ============================================================================

/// A single `X-RateLimit-*` value: integer when it parses, raw otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RateLimitValue {
    /// Parsed integer.
    Integer(i64),
    /// Unparseable value kept verbatim.
    Raw(String),
}

impl RateLimitValue {
    /// Integer value, if it parsed.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            Self::Raw(_) => None,
        }
    }
}

/// Rate-limit state reported by one response.
///
/// `dimensions` maps a lower-cased dimension (e.g. `session`, `appday`) to
/// lower-cased fields (e.g. `remaining`, `reset`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitSnapshot {
    /// Dimension → field → value.
    pub dimensions: BTreeMap<String, BTreeMap<String, RateLimitValue>>,
    /// Every `X-RateLimit-*` header as received.
    pub raw_headers: BTreeMap<String, String>,
}

impl RateLimitSnapshot {
    /// No rate-limit headers were seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// Integer field of one dimension.
    #[must_use]
    pub fn field(&self, dimension: &str, field: &str) -> Option<i64> {
        self.dimensions
            .get(dimension)
            .and_then(|fields| fields.get(field))
            .and_then(RateLimitValue::as_i64)
    }

    /// Smallest positive `reset` value across all dimensions, in seconds.
    #[must_use]
    pub fn min_positive_reset(&self) -> Option<i64> {
        self.dimensions
            .values()
            .filter_map(|fields| fields.get("reset").and_then(RateLimitValue::as_i64))
            .filter(|reset| *reset > 0)
            .min()
    }
}

// ============================================================================
// Port Replies
// ============================================================================

/// Parsed reply to an order placement.
///
/// Classification into success, failure, or uncertainty is left to the
/// caller, which owns the list of ambiguous error codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementReply {
    /// Order id, from the root or the first entry of `Orders`.
    pub order_id: Option<OrderId>,
    /// Embedded business error.
    pub error: Option<BusinessError>,
    /// `x-request-id` the placement was sent with.
    pub request_id: Option<RequestId>,
}

// ============================================================================
// Venue Error
// ============================================================================

/// Errors surfaced by venue adapters.
#[derive(Debug, Clone, Error)]
pub enum VenueError {
    /// Venue rejected the credentials (401/403).
    #[error("authentication rejected (HTTP {status})")]
    Authentication {
        /// HTTP status.
        status: u16,
    },

    /// No usable credential could be obtained.
    #[error("credentials unavailable: {message}")]
    Credentials {
        /// Provider error.
        message: String,
    },

    /// Still rate limited after the retry budget.
    #[error("rate limited after {attempts} attempt(s)")]
    RateLimited {
        /// Attempts made.
        attempts: u32,
        /// Last rate-limit snapshot.
        rate_limits: RateLimitSnapshot,
    },

    /// Non-2xx response other than auth and rate limiting.
    #[error("venue returned HTTP {status}: {message}")]
    Remote {
        /// HTTP status.
        status: u16,
        /// Venue `ErrorCode`, when present.
        code: Option<String>,
        /// Venue `Message` or body excerpt.
        message: String,
        /// Last rate-limit snapshot.
        rate_limits: RateLimitSnapshot,
    },

    /// Timeout or connection failure.
    #[error("transient transport failure: {message}")]
    Transient {
        /// Error description.
        message: String,
        /// The request timed out (as opposed to failing to connect).
        timeout: bool,
    },

    /// Response did not match the expected shape.
    #[error("malformed venue response: {message}")]
    MalformedResponse {
        /// What was wrong.
        message: String,
    },

    /// The requested resource does not exist.
    #[error("not found: {what}")]
    NotFound {
        /// Resource description.
        what: String,
    },
}

impl VenueError {
    /// Setup defects that must reach the caller instead of being folded
    /// into a business outcome.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. } | Self::Credentials { .. } | Self::MalformedResponse { .. }
        )
    }

    /// Conditions worth retrying at a higher level.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Transient { .. } | Self::RateLimited { .. } => true,
            Self::Remote { status, .. } => matches!(*status, 500 | 502 | 503 | 504),
            _ => false,
        }
    }

    /// Short code used when a transport failure becomes a business outcome.
    #[must_use]
    pub fn code(&self) -> String {
        match self {
            Self::Authentication { .. } => "AUTHENTICATION".to_string(),
            Self::Credentials { .. } => "CREDENTIALS".to_string(),
            Self::RateLimited { .. } => "RATE_LIMITED".to_string(),
            Self::Remote {
                code: Some(code), ..
            } => code.clone(),
            Self::Remote { status, .. } => format!("HTTP_{status}"),
            Self::Transient { timeout: true, .. } => "TIMEOUT".to_string(),
            Self::Transient { .. } => "NETWORK_ERROR".to_string(),
            Self::MalformedResponse { .. } => "MALFORMED_RESPONSE".to_string(),
            Self::NotFound { .. } => "NOT_FOUND".to_string(),
        }
    }
}

// ============================================================================
// Venue Port Trait
// ============================================================================

/// Venue port for instrument, position, precheck, disclaimer, placement,
/// and ledger calls.
#[async_trait]
pub trait VenuePort: Send + Sync {
    /// Fetch trading constraints for an instrument.
    async fn instrument_details(
        &self,
        instrument: &InstrumentKey,
        account_key: Option<&AccountKey>,
    ) -> Result<InstrumentConstraints, VenueError>;

    /// List net positions for a client.
    async fn net_positions(&self, client_key: &ClientKey) -> Result<Vec<Position>, VenueError>;

    /// Submit a non-binding dry run of the order.
    async fn precheck_order(&self, order: &OrderIntention)
    -> Result<PrecheckOutcome, VenueError>;

    /// Fetch one disclaimer's details.
    async fn disclaimer_details(&self, token: &str) -> Result<DisclaimerRecord, VenueError>;

    /// Accept one disclaimer. Side-effecting.
    async fn accept_disclaimer(&self, context: &str, token: &str) -> Result<(), VenueError>;

    /// Place the order. Side-effecting.
    async fn place_order(&self, order: &OrderIntention) -> Result<PlacementReply, VenueError>;

    /// Look up one order in the ledger.
    async fn order_by_id(
        &self,
        client_key: &ClientKey,
        order_id: &OrderId,
    ) -> Result<Option<LedgerOrder>, VenueError>;

    /// Most recent orders for a client, newest first, at most `limit`.
    async fn recent_orders(
        &self,
        client_key: &ClientKey,
        limit: usize,
    ) -> Result<Vec<LedgerOrder>, VenueError>;
}
