//! The order intention: the unit of work handed to the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::correlation::ExternalReference;
use crate::domain::order_execution::value_objects::{DurationType, OrderSide, OrderType};
use crate::domain::shared::{AccountKey, ClientKey, InstrumentKey, Quantity, RequestId};

/// A caller's decision to buy or sell a quantity of one instrument.
///
/// Invariants (quantity > 0, correlation ≤ 50 chars) are carried by the
/// field types, so every constructed or deserialized intention is valid.
/// Once handed to the pipeline it is treated as immutable; the pipeline
/// derives adjusted copies through the crate-private `with_*` methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderIntention {
    account_key: AccountKey,
    client_key: ClientKey,
    instrument: InstrumentKey,
    side: OrderSide,
    quantity: Quantity,
    #[serde(default = "default_order_type")]
    order_type: OrderType,
    #[serde(default)]
    duration: DurationType,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    manual_order: bool,
    #[serde(default)]
    external_reference: Option<ExternalReference>,
    #[serde(default)]
    request_id: Option<RequestId>,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    strategy_id: Option<String>,
}

const fn default_order_type() -> OrderType {
    OrderType::Market
}

impl OrderIntention {
    /// Create a day market order intention.
    #[must_use]
    pub const fn market(
        account_key: AccountKey,
        client_key: ClientKey,
        instrument: InstrumentKey,
        side: OrderSide,
        quantity: Quantity,
    ) -> Self {
        Self {
            account_key,
            client_key,
            instrument,
            side,
            quantity,
            order_type: OrderType::Market,
            duration: DurationType::DayOrder,
            expires_at: None,
            manual_order: false,
            external_reference: None,
            request_id: None,
            symbol: None,
            strategy_id: None,
        }
    }

    /// Set the correlation string.
    #[must_use]
    pub fn with_external_reference(mut self, reference: ExternalReference) -> Self {
        self.external_reference = Some(reference);
        self
    }

    /// Set the strategy that produced this intention.
    #[must_use]
    pub fn with_strategy_id(mut self, strategy_id: impl Into<String>) -> Self {
        self.strategy_id = Some(strategy_id.into());
        self
    }

    /// Attach a display symbol.
    #[must_use]
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// Set the requested duration policy.
    #[must_use]
    pub const fn with_duration(mut self, duration: DurationType) -> Self {
        self.duration = duration;
        self
    }

    /// Set the expiry for `GoodTillDate` orders.
    #[must_use]
    pub const fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Set the order kind.
    #[must_use]
    pub const fn with_order_type(mut self, order_type: OrderType) -> Self {
        self.order_type = order_type;
        self
    }

    /// Replace account and client keys with the authenticated session's.
    #[must_use]
    pub(crate) fn with_session_keys(mut self, account_key: AccountKey, client_key: ClientKey) -> Self {
        self.account_key = account_key;
        self.client_key = client_key;
        self
    }

    /// Record the per-attempt token used for the latest venue call.
    #[must_use]
    pub(crate) fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Copy with an adjusted quantity (used for sell clamping).
    #[must_use]
    pub(crate) const fn with_quantity(mut self, quantity: Quantity) -> Self {
        self.quantity = quantity;
        self
    }

    /// Account the order is booked against.
    #[must_use]
    pub const fn account_key(&self) -> &AccountKey {
        &self.account_key
    }

    /// Client owning the account.
    #[must_use]
    pub const fn client_key(&self) -> &ClientKey {
        &self.client_key
    }

    /// Instrument to trade.
    #[must_use]
    pub const fn instrument(&self) -> &InstrumentKey {
        &self.instrument
    }

    /// Direction.
    #[must_use]
    pub const fn side(&self) -> OrderSide {
        self.side
    }

    /// Requested amount.
    #[must_use]
    pub const fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Order kind.
    #[must_use]
    pub const fn order_type(&self) -> OrderType {
        self.order_type
    }

    /// Requested duration, before market-order normalization.
    #[must_use]
    pub const fn requested_duration(&self) -> DurationType {
        self.duration
    }

    /// Duration actually sent to the venue: market orders are always day orders.
    #[must_use]
    pub const fn effective_duration(&self) -> DurationType {
        match self.order_type {
            OrderType::Market => DurationType::DayOrder,
            _ => self.duration,
        }
    }

    /// Expiry for `GoodTillDate` orders.
    #[must_use]
    pub const fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the order is flagged as manually entered.
    #[must_use]
    pub const fn manual_order(&self) -> bool {
        self.manual_order
    }

    /// Correlation string, if assigned.
    #[must_use]
    pub const fn external_reference(&self) -> Option<&ExternalReference> {
        self.external_reference.as_ref()
    }

    /// Token of the latest venue attempt, if any.
    #[must_use]
    pub const fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// Display symbol, if provided.
    #[must_use]
    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    /// Strategy that produced this intention, if provided.
    #[must_use]
    pub fn strategy_id(&self) -> Option<&str> {
        self.strategy_id.as_deref()
    }
}
