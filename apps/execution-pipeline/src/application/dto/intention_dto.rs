//! Order intention DTO
//!
//! JSON shape accepted by the binary and other external callers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::order_execution::{
    DurationType, ExternalReference, OrderIntention, OrderSide, OrderType,
};
use crate::domain::shared::{AccountKey, AssetType, ClientKey, DomainError, InstrumentKey, Quantity};

/// DTO for submitting an order intention.
///
/// Account and client keys are optional: the pipeline overwrites them with
/// the session's keys either way.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderIntentionDto {
    /// Account key.
    #[serde(default)]
    pub account_key: Option<String>,
    /// Client key.
    #[serde(default)]
    pub client_key: Option<String>,
    /// Asset type.
    pub asset_type: AssetType,
    /// Venue instrument code.
    pub uic: u32,
    /// Side.
    pub side: OrderSide,
    /// Quantity.
    pub quantity: Decimal,
    /// Order type (Market when omitted).
    #[serde(default)]
    pub order_type: Option<OrderType>,
    /// Requested duration.
    #[serde(default)]
    pub duration: Option<DurationType>,
    /// Expiry for `GoodTillDate`.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Caller-supplied correlation string.
    #[serde(default)]
    pub external_reference: Option<String>,
    /// Strategy that produced the intention.
    #[serde(default)]
    pub strategy_id: Option<String>,
    /// Display symbol.
    #[serde(default)]
    pub symbol: Option<String>,
}

impl OrderIntentionDto {
    /// Convert to the domain intention.
    ///
    /// # Errors
    ///
    /// Returns an error for a non-positive quantity or an invalid
    /// correlation string.
    pub fn into_domain(self) -> Result<OrderIntention, DomainError> {
        let mut intention = OrderIntention::market(
            AccountKey::new(self.account_key.unwrap_or_default()),
            ClientKey::new(self.client_key.unwrap_or_default()),
            InstrumentKey::new(self.asset_type, self.uic),
            self.side,
            Quantity::new(self.quantity)?,
        );
        if let Some(order_type) = self.order_type {
            intention = intention.with_order_type(order_type);
        }
        if let Some(duration) = self.duration {
            intention = intention.with_duration(duration);
        }
        if let Some(expires_at) = self.expires_at {
            intention = intention.with_expiry(expires_at);
        }
        if let Some(reference) = self.external_reference {
            intention = intention.with_external_reference(ExternalReference::new(reference)?);
        }
        if let Some(strategy_id) = self.strategy_id {
            intention = intention.with_strategy_id(strategy_id);
        }
        if let Some(symbol) = self.symbol {
            intention = intention.with_symbol(symbol);
        }
        Ok(intention)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parses_minimal_intention() {
        let dto: OrderIntentionDto = serde_json::from_str(
            r#"{"asset_type": "Stock", "uic": 211, "side": "Buy", "quantity": "100"}"#,
        )
        .unwrap();
        let intention = dto.into_domain().unwrap();
        assert_eq!(intention.instrument().to_string(), "Stock:211");
        assert_eq!(intention.quantity().amount(), dec!(100));
        assert_eq!(intention.order_type(), OrderType::Market);
    }

    #[test]
    fn test_rejects_zero_quantity() {
        let dto: OrderIntentionDto = serde_json::from_str(
            r#"{"asset_type": "Stock", "uic": 211, "side": "Sell", "quantity": 0}"#,
        )
        .unwrap();
        assert!(dto.into_domain().is_err());
    }

    #[test]
    fn test_rejects_long_reference() {
        let dto = OrderIntentionDto {
            external_reference: Some("x".repeat(51)),
            ..serde_json::from_str::<OrderIntentionDto>(
                r#"{"asset_type": "Stock", "uic": 211, "side": "Buy", "quantity": 1}"#,
            )
            .unwrap()
        };
        assert!(dto.into_domain().is_err());
    }
}
