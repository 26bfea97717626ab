//! Buy and sell eligibility rules against current holdings.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::position::Position;

/// What to do when buying an instrument already held long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateBuyPolicy {
    /// Block the buy.
    #[default]
    Block,
    /// Allow the buy and log a warning.
    Warn,
    /// Allow the buy silently.
    Allow,
}

/// Guard configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardPolicy {
    /// Treatment of buys on an existing long.
    pub duplicate_buy: DuplicateBuyPolicy,
    /// Allow buys that reduce a short.
    pub allow_short_covering: bool,
    /// Block buys when positions could not be loaded and nothing is cached
    /// for the instrument.
    pub block_on_position_failure: bool,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self {
            duplicate_buy: DuplicateBuyPolicy::Block,
            allow_short_covering: false,
            block_on_position_failure: true,
        }
    }
}

/// Machine-readable reason attached to every guard decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardReason {
    /// Nothing held; buy allowed.
    NoExistingPosition,
    /// Long held and policy blocks.
    DuplicateBuyPrevented,
    /// Long held and policy warns.
    DuplicateBuyWarned,
    /// Long held and policy allows.
    DuplicateBuyAllowed,
    /// Buy covers a short, which is enabled.
    ReducingShortPosition,
    /// Buy would cover a short, which is disabled.
    ShortCoveringNotConfigured,
    /// Row exists with zero quantity.
    ZeroPosition,
    /// Positions unavailable and nothing cached.
    PositionDataUnavailable,
    /// Nothing to sell.
    NoPositionToSell,
    /// Position is short; sells never extend it.
    PositionIsShort,
    /// Broker locked the position.
    PositionLockedByBroker,
    /// Long held; sell allowed as requested.
    PositionExists,
    /// Long held; sell allowed for the held amount only.
    SellQuantityClamped,
}

impl GuardReason {
    /// Stable label used in logs and results.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NoExistingPosition => "no_existing_position",
            Self::DuplicateBuyPrevented => "duplicate_buy_prevented",
            Self::DuplicateBuyWarned => "duplicate_buy_warned",
            Self::DuplicateBuyAllowed => "duplicate_buy_allowed",
            Self::ReducingShortPosition => "reducing_short_position",
            Self::ShortCoveringNotConfigured => "short_covering_not_configured",
            Self::ZeroPosition => "zero_position",
            Self::PositionDataUnavailable => "position_data_unavailable",
            Self::NoPositionToSell => "no_position_to_sell",
            Self::PositionIsShort => "position_is_short",
            Self::PositionLockedByBroker => "position_locked_by_broker",
            Self::PositionExists => "position_exists",
            Self::SellQuantityClamped => "sell_quantity_clamped",
        }
    }
}

impl fmt::Display for GuardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a guard evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardDecision {
    /// Whether the order may proceed.
    pub allowed: bool,
    /// Why.
    pub reason: GuardReason,
    /// Current net quantity, when a row exists.
    pub position_quantity: Option<Decimal>,
    /// Quantity the order may use (sells only).
    pub approved_quantity: Option<Decimal>,
}

impl GuardDecision {
    const fn allow(reason: GuardReason, position_quantity: Option<Decimal>) -> Self {
        Self {
            allowed: true,
            reason,
            position_quantity,
            approved_quantity: None,
        }
    }

    const fn block(reason: GuardReason, position_quantity: Option<Decimal>) -> Self {
        Self {
            allowed: false,
            reason,
            position_quantity,
            approved_quantity: None,
        }
    }
}

/// Decide whether a buy may proceed.
///
/// `data_unavailable` is true when the last position refresh failed.
#[must_use]
pub fn evaluate_buy(
    policy: &GuardPolicy,
    position: Option<&Position>,
    data_unavailable: bool,
) -> GuardDecision {
    let Some(position) = position else {
        if data_unavailable {
            return if policy.block_on_position_failure {
                GuardDecision::block(GuardReason::PositionDataUnavailable, None)
            } else {
                GuardDecision::allow(GuardReason::PositionDataUnavailable, None)
            };
        }
        return GuardDecision::allow(GuardReason::NoExistingPosition, None);
    };

    let qty = Some(position.net_quantity);
    if position.is_long() {
        return match policy.duplicate_buy {
            DuplicateBuyPolicy::Block => {
                GuardDecision::block(GuardReason::DuplicateBuyPrevented, qty)
            }
            DuplicateBuyPolicy::Warn => GuardDecision::allow(GuardReason::DuplicateBuyWarned, qty),
            DuplicateBuyPolicy::Allow => {
                GuardDecision::allow(GuardReason::DuplicateBuyAllowed, qty)
            }
        };
    }
    if position.is_short() {
        return if policy.allow_short_covering {
            GuardDecision::allow(GuardReason::ReducingShortPosition, qty)
        } else {
            GuardDecision::block(GuardReason::ShortCoveringNotConfigured, qty)
        };
    }
    GuardDecision::allow(GuardReason::ZeroPosition, qty)
}

/// Decide whether a sell may proceed, and for how much.
///
/// Without a requested quantity the whole position is closed. A request
/// above the held amount is clamped down to it.
#[must_use]
pub fn evaluate_sell(
    position: Option<&Position>,
    data_unavailable: bool,
    requested: Option<Decimal>,
) -> GuardDecision {
    let Some(position) = position else {
        let reason = if data_unavailable {
            GuardReason::PositionDataUnavailable
        } else {
            GuardReason::NoPositionToSell
        };
        return GuardDecision::block(reason, None);
    };

    let held = position.net_quantity;
    let qty = Some(held);
    if position.is_short() {
        return GuardDecision::block(GuardReason::PositionIsShort, qty);
    }
    if position.is_flat() {
        return GuardDecision::block(GuardReason::ZeroPosition, qty);
    }
    if !position.can_be_closed {
        return GuardDecision::block(GuardReason::PositionLockedByBroker, qty);
    }

    let (reason, approved) = match requested {
        Some(requested) if requested > held => (GuardReason::SellQuantityClamped, held),
        Some(requested) => (GuardReason::PositionExists, requested),
        None => (GuardReason::PositionExists, held),
    };
    GuardDecision {
        allowed: true,
        reason,
        position_quantity: qty,
        approved_quantity: Some(approved),
    }
}
