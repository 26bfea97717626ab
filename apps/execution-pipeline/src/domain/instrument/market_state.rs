//! Market state of an instrument's venue.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Trading session state as reported by the venue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketState {
    /// Continuous trading.
    Open,
    /// Closed.
    Closed,
    /// Opening auction.
    OpeningAuction,
    /// Closing auction.
    ClosingAuction,
    /// Intraday auction.
    IntraDayAuction,
    /// Post-close trading at the last price.
    TradingAtLast,
    /// Pre-trading session.
    PreTrading,
    /// Post-trading session.
    PostTrading,
    /// Pre-market session.
    PreMarket,
    /// Post-market session.
    PostMarket,
    /// Venue reported `Unknown`.
    Unknown,
    /// A state this build does not recognize.
    Unrecognized(String),
}

impl MarketState {
    /// Parse the venue's string. Never fails: unrecognized values are kept
    /// verbatim and treated as blocking.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "Open" => Self::Open,
            "Closed" => Self::Closed,
            "OpeningAuction" => Self::OpeningAuction,
            "ClosingAuction" => Self::ClosingAuction,
            "IntraDayAuction" => Self::IntraDayAuction,
            "TradingAtLast" => Self::TradingAtLast,
            "PreTrading" => Self::PreTrading,
            "PostTrading" => Self::PostTrading,
            "PreMarket" => Self::PreMarket,
            "PostMarket" => Self::PostMarket,
            "Unknown" => Self::Unknown,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    /// Only continuous trading permits market orders; every other state,
    /// including unrecognized ones, blocks.
    #[must_use]
    pub const fn permits_trading(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for MarketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unrecognized(raw) => f.write_str(raw),
            other => write!(f, "{other:?}"),
        }
    }
}
