//! Net position rows.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::shared::{AccountKey, InstrumentKey};

/// Net holding of one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Venue position id.
    pub position_id: Option<String>,
    /// Instrument held.
    pub instrument: InstrumentKey,
    /// Account holding the position.
    pub account_key: Option<AccountKey>,
    /// Signed net amount: positive long, negative short.
    pub net_quantity: Decimal,
    /// Average open price.
    pub average_open_price: Option<Decimal>,
    /// Current market value.
    pub market_value: Option<Decimal>,
    /// Unrealized profit or loss.
    pub unrealized_pnl: Option<Decimal>,
    /// Position currency.
    pub currency: Option<String>,
    /// Broker-side lock flag; `false` means the position cannot be closed.
    pub can_be_closed: bool,
}

impl Position {
    /// A bare position with only instrument and quantity known.
    #[must_use]
    pub const fn new(instrument: InstrumentKey, net_quantity: Decimal) -> Self {
        Self {
            position_id: None,
            instrument,
            account_key: None,
            net_quantity,
            average_open_price: None,
            market_value: None,
            unrealized_pnl: None,
            currency: None,
            can_be_closed: true,
        }
    }

    /// Long position.
    #[must_use]
    pub fn is_long(&self) -> bool {
        self.net_quantity > Decimal::ZERO
    }

    /// Short position.
    #[must_use]
    pub fn is_short(&self) -> bool {
        self.net_quantity < Decimal::ZERO
    }

    /// Flat row.
    #[must_use]
    pub fn is_flat(&self) -> bool {
        self.net_quantity.is_zero()
    }

    /// Fold another row for the same instrument into this one.
    ///
    /// Quantities and values add; the lock flag is sticky.
    fn absorb(&mut self, other: Self) {
        self.net_quantity += other.net_quantity;
        self.market_value = match (self.market_value, other.market_value) {
            (Some(a), Some(b)) => Some(a + b),
            (a, b) => a.or(b),
        };
        self.unrealized_pnl = match (self.unrealized_pnl, other.unrealized_pnl) {
            (Some(a), Some(b)) => Some(a + b),
            (a, b) => a.or(b),
        };
        self.can_be_closed &= other.can_be_closed;
    }
}

/// Positions keyed by instrument.
pub type PositionMap = HashMap<InstrumentKey, Position>;

/// Build a map from venue rows, merging rows that share an instrument
/// (the same instrument held in several accounts of one client).
#[must_use]
pub fn index_positions(rows: Vec<Position>) -> PositionMap {
    let mut map = PositionMap::with_capacity(rows.len());
    for row in rows {
        match map.get_mut(&row.instrument) {
            Some(existing) => existing.absorb(row),
            None => {
                map.insert(row.instrument, row);
            }
        }
    }
    map
}
