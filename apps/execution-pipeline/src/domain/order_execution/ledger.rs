//! Orders as reported by the venue's order ledger.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::OrderSide;
use crate::domain::shared::{InstrumentKey, OrderId};

/// One row of the venue order ledger.
///
/// `raw` keeps the venue's JSON verbatim for audit callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerOrder {
    /// Venue order id.
    pub order_id: OrderId,
    /// Venue status string, e.g. `Working` or `Filled`.
    pub status: String,
    /// Correlation string the order was placed with.
    pub external_reference: Option<String>,
    /// Instrument, when the row names a tradable asset class.
    pub instrument: Option<InstrumentKey>,
    /// Side.
    pub side: Option<OrderSide>,
    /// Ordered amount.
    pub amount: Option<Decimal>,
    /// Amount filled so far.
    pub filled_amount: Option<Decimal>,
    /// Execution or limit price.
    pub price: Option<Decimal>,
    /// Time the order was created.
    pub order_time: Option<DateTime<Utc>>,
    /// The venue's JSON for this order.
    pub raw: serde_json::Value,
}
