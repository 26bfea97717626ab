//! Order kinds accepted by the venue.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::shared::DomainError;

/// Order kind. Only [`OrderType::Market`] is routed by the pipeline today;
/// the other kinds exist so instrument constraints can be parsed and checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    /// Execute at the prevailing price.
    Market,
    /// Execute at the limit price or better.
    Limit,
    /// Market order triggered at the stop price.
    Stop,
    /// Limit order triggered at the stop price.
    StopLimit,
}

impl OrderType {
    /// Wire name of the order type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Market => "Market",
            Self::Limit => "Limit",
            Self::Stop => "Stop",
            Self::StopLimit => "StopLimit",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Market" => Ok(Self::Market),
            "Limit" => Ok(Self::Limit),
            "Stop" | "StopIfTraded" => Ok(Self::Stop),
            "StopLimit" => Ok(Self::StopLimit),
            other => Err(DomainError::invalid_value(
                "order_type",
                format!("unknown order type '{other}'"),
            )),
        }
    }
}
