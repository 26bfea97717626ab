//! Order duration policies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::shared::DomainError;

/// How long an order stays live at the venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DurationType {
    /// Expires at the end of the trading day.
    #[default]
    DayOrder,
    /// Live until cancelled.
    GoodTillCancel,
    /// Live until an explicit expiration time.
    GoodTillDate,
    /// Fill completely or cancel.
    FillOrKill,
    /// Fill what is possible immediately, cancel the rest.
    ImmediateOrCancel,
}

impl DurationType {
    /// Wire name of the duration type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DayOrder => "DayOrder",
            Self::GoodTillCancel => "GoodTillCancel",
            Self::GoodTillDate => "GoodTillDate",
            Self::FillOrKill => "FillOrKill",
            Self::ImmediateOrCancel => "ImmediateOrCancel",
        }
    }
}

impl fmt::Display for DurationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DurationType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DayOrder" => Ok(Self::DayOrder),
            "GoodTillCancel" => Ok(Self::GoodTillCancel),
            "GoodTillDate" => Ok(Self::GoodTillDate),
            "FillOrKill" => Ok(Self::FillOrKill),
            "ImmediateOrCancel" => Ok(Self::ImmediateOrCancel),
            other => Err(DomainError::invalid_value(
                "duration_type",
                format!("unknown duration type '{other}'"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_day_order() {
        assert_eq!(DurationType::default(), DurationType::DayOrder);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!("AtTheOpening".parse::<DurationType>().is_err());
        assert_eq!(
            "GoodTillDate".parse::<DurationType>().unwrap(),
            DurationType::GoodTillDate
        );
    }
}
