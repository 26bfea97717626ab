//! Per-instrument trading constraints and the checks run against them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::instrument::MarketState;
use crate::domain::order_execution::{DurationType, OrderIntention, OrderType};
use crate::domain::shared::InstrumentKey;

/// Durations the venue allows for one order kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTypeSetting {
    /// Order kind.
    pub order_type: OrderType,
    /// Allowed durations for that kind.
    pub duration_types: Vec<DurationType>,
}

/// Trading constraints for one instrument, replaced wholesale on refresh.
///
/// `None` on an optional constraint means the venue did not report it,
/// which is "no constraint known" rather than "forbidden". Tradability and
/// market state are the exceptions: both fail closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentConstraints {
    /// Instrument these constraints belong to.
    pub instrument: InstrumentKey,
    /// Whether the venue allows trading at all.
    pub tradable: bool,
    /// Why the instrument is not tradable.
    pub non_tradable_reason: Option<String>,
    /// Current market state.
    pub market_state: Option<MarketState>,
    /// Allowed decimal places for the amount.
    pub amount_decimals: Option<u32>,
    /// Minimum amount increment.
    pub increment_size: Option<Decimal>,
    /// Lot size amounts must align to.
    pub lot_size: Option<Decimal>,
    /// Minimum trade size.
    pub minimum_trade_size: Option<Decimal>,
    /// Price tick size.
    pub tick_size: Option<Decimal>,
    /// Supported order kinds.
    pub supported_order_types: Option<Vec<OrderType>>,
    /// Supported durations per order kind.
    pub order_type_settings: Option<Vec<OrderTypeSetting>>,
    /// Venue symbol.
    pub symbol: Option<String>,
    /// Venue description.
    pub description: Option<String>,
}

/// Why an intention failed instrument validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationRejection {
    /// Venue marks the instrument non-tradable.
    #[error("instrument not tradable: {reason}")]
    NotTradable {
        /// Venue reason, or a placeholder when none was given.
        reason: String,
    },
    /// Market state blocks trading.
    #[error("market state {} does not permit trading", describe_state(.state.as_ref()))]
    MarketState {
        /// Reported state, `None` when absent.
        state: Option<MarketState>,
    },
    /// Order kind is not supported for this instrument.
    #[error("order type {order_type} not supported")]
    UnsupportedOrderType {
        /// Requested kind.
        order_type: OrderType,
    },
    /// Duration is not supported for this order kind.
    #[error("duration {duration} not supported for {order_type} orders")]
    UnsupportedDuration {
        /// Requested kind.
        order_type: OrderType,
        /// Requested duration.
        duration: DurationType,
    },
    /// Amount has more decimal places than allowed.
    #[error("amount {amount} exceeds {decimals} decimal places")]
    PrecisionExceeded {
        /// Requested amount.
        amount: Decimal,
        /// Allowed decimal places.
        decimals: u32,
    },
    /// Amount is not a multiple of the increment.
    #[error("amount {amount} is not a multiple of increment {increment}")]
    IncrementMisaligned {
        /// Requested amount.
        amount: Decimal,
        /// Required increment.
        increment: Decimal,
    },
    /// Amount is not a multiple of the lot size.
    #[error("amount {amount} is not a multiple of lot size {lot_size}")]
    LotSizeMisaligned {
        /// Requested amount.
        amount: Decimal,
        /// Required lot size.
        lot_size: Decimal,
    },
    /// Amount is below the minimum trade size.
    #[error("amount {amount} is below minimum trade size {minimum}")]
    BelowMinimum {
        /// Requested amount.
        amount: Decimal,
        /// Minimum trade size.
        minimum: Decimal,
    },
    /// The venue does not know the instrument.
    #[error("instrument not found")]
    InstrumentNotFound,
    /// Constraints could not be fetched.
    #[error("instrument lookup failed: {message}")]
    LookupFailed {
        /// Underlying error.
        message: String,
    },
}

fn describe_state(state: Option<&MarketState>) -> String {
    state.map_or_else(|| "<absent>".to_string(), ToString::to_string)
}

impl ValidationRejection {
    /// Whether this rejection stems from the market state.
    #[must_use]
    pub const fn is_market_state(&self) -> bool {
        matches!(self, Self::MarketState { .. })
    }
}

/// Exact alignment test: `amount mod increment == 0`.
///
/// A non-positive increment imposes no constraint.
#[must_use]
pub fn is_aligned(amount: Decimal, increment: Decimal) -> bool {
    if increment <= Decimal::ZERO {
        return true;
    }
    (amount % increment).is_zero()
}

impl InstrumentConstraints {
    /// Constraints with nothing known except tradability and market state.
    #[must_use]
    pub const fn minimal(
        instrument: InstrumentKey,
        tradable: bool,
        market_state: Option<MarketState>,
    ) -> Self {
        Self {
            instrument,
            tradable,
            non_tradable_reason: None,
            market_state,
            amount_decimals: None,
            increment_size: None,
            lot_size: None,
            minimum_trade_size: None,
            tick_size: None,
            supported_order_types: None,
            order_type_settings: None,
            symbol: None,
            description: None,
        }
    }

    /// Run every check in order: tradability, market state, order kind,
    /// duration, amount.
    pub fn validate(&self, intention: &OrderIntention) -> Result<(), ValidationRejection> {
        self.check_tradable()?;
        self.check_market_state()?;
        self.check_order_type(intention.order_type())?;
        self.check_duration(intention.order_type(), intention.effective_duration())?;
        self.check_amount(intention.quantity().amount())
    }

    /// Reject non-tradable instruments.
    pub fn check_tradable(&self) -> Result<(), ValidationRejection> {
        if self.tradable {
            return Ok(());
        }
        Err(ValidationRejection::NotTradable {
            reason: self
                .non_tradable_reason
                .clone()
                .unwrap_or_else(|| "no reason given".to_string()),
        })
    }

    /// Reject any state but `Open`, including an absent one.
    pub fn check_market_state(&self) -> Result<(), ValidationRejection> {
        match &self.market_state {
            Some(state) if state.permits_trading() => Ok(()),
            state => Err(ValidationRejection::MarketState {
                state: state.clone(),
            }),
        }
    }

    /// Reject order kinds outside a reported supported set.
    pub fn check_order_type(&self, order_type: OrderType) -> Result<(), ValidationRejection> {
        let declared = self
            .supported_order_types
            .as_ref()
            .filter(|types| !types.is_empty())
            .map(|types| types.contains(&order_type));
        let in_settings = self
            .order_type_settings
            .as_ref()
            .filter(|settings| !settings.is_empty())
            .map(|settings| settings.iter().any(|s| s.order_type == order_type));

        match declared.or(in_settings) {
            Some(false) => Err(ValidationRejection::UnsupportedOrderType { order_type }),
            _ => Ok(()),
        }
    }

    /// Reject durations outside a reported per-kind set.
    pub fn check_duration(
        &self,
        order_type: OrderType,
        duration: DurationType,
    ) -> Result<(), ValidationRejection> {
        let allowed = self
            .order_type_settings
            .as_ref()
            .and_then(|settings| settings.iter().find(|s| s.order_type == order_type))
            .map(|s| s.duration_types.as_slice())
            .filter(|durations| !durations.is_empty());

        match allowed {
            Some(durations) if !durations.contains(&duration) => {
                Err(ValidationRejection::UnsupportedDuration {
                    order_type,
                    duration,
                })
            }
            _ => Ok(()),
        }
    }

    /// Precision, increment, lot size, and minimum checks with exact decimals.
    pub fn check_amount(&self, amount: Decimal) -> Result<(), ValidationRejection> {
        if let Some(decimals) = self.amount_decimals {
            if amount.normalize().scale() > decimals {
                return Err(ValidationRejection::PrecisionExceeded { amount, decimals });
            }
        }

        if let Some(increment) = self.increment_size {
            if !is_aligned(amount, increment) {
                return Err(ValidationRejection::IncrementMisaligned { amount, increment });
            }
        }

        if let Some(lot_size) = self.lot_size {
            if !is_aligned(amount, lot_size) {
                return Err(ValidationRejection::LotSizeMisaligned { amount, lot_size });
            }
        }

        if let Some(minimum) = self.minimum_trade_size {
            if amount < minimum {
                return Err(ValidationRejection::BelowMinimum { amount, minimum });
            }
        }

        Ok(())
    }
}
