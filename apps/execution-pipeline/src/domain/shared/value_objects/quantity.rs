//! Quantity value object for order amounts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::DomainError;

/// A strictly positive order amount.
///
/// Held as an exact decimal; fractional amounts are allowed for FX and
/// crypto pairs, subject to the instrument's precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Quantity(Decimal);

impl Quantity {
    /// Create a quantity, rejecting zero and negative amounts.
    pub fn new(amount: Decimal) -> Result<Self, DomainError> {
        if amount <= Decimal::ZERO {
            return Err(DomainError::invalid_value(
                "quantity",
                format!("must be greater than zero, got {amount}"),
            ));
        }
        Ok(Self(amount))
    }

    /// Create a quantity from a whole number of units.
    pub fn from_units(units: u64) -> Result<Self, DomainError> {
        Self::new(Decimal::from(units))
    }

    /// Get the inner Decimal value.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// The smaller of `self` and `cap`.
    #[must_use]
    pub fn clamp_to(self, cap: Self) -> Self {
        if self.0 > cap.0 { cap } else { self }
    }
}

impl TryFrom<Decimal> for Quantity {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for Decimal {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
