//! Saxo OpenAPI request and response types.
//!
//! These types map directly to the venue's PascalCase JSON. Conversions
//! into domain types are strict: a response missing a required field is a
//! [`TransportError::MalformedResponse`].

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::TransportError;
use crate::application::ports::PlacementReply;
use crate::domain::disclaimer::{ACCEPTED_RESPONSE, DisclaimerBundle, DisclaimerRecord};
use crate::domain::instrument::{InstrumentConstraints, MarketState, OrderTypeSetting};
use crate::domain::order_execution::{
    BusinessError, DurationType, LedgerOrder, OrderIntention, PrecheckOutcome,
};
use crate::domain::position::Position;
use crate::domain::shared::{AccountKey, AssetType, InstrumentKey, Money, OrderId, RequestId};

/// Field groups requested on instrument details.
pub const INSTRUMENT_FIELD_GROUPS: &str = "DisplayAndFormat,InstrumentInfo,OrderSetting,TradingStatus";
/// Field groups requested on net positions.
pub const NET_POSITION_FIELD_GROUPS: &str = "NetPositionBase,NetPositionView";
/// Field groups added to precheck bodies.
pub const PRECHECK_FIELD_GROUPS: [&str; 2] = ["Costs", "MarginImpactBuySell"];

// ============================================================================
// Order Request Types
// ============================================================================

/// Order body shared by precheck and placement.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderRequest {
    /// Account the order is booked against.
    pub account_key: String,
    /// Quantity, sent as a JSON number with every digit kept.
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub amount: Decimal,
    /// Asset class.
    pub asset_type: String,
    /// `Buy` or `Sell`.
    pub buy_sell: String,
    /// Instrument code.
    pub uic: u32,
    /// Order kind.
    pub order_type: String,
    /// Duration block.
    pub order_duration: OrderDuration,
    /// Manual-order flag.
    pub manual_order: bool,
    /// Correlation string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_reference: Option<String>,
    /// Extra response field groups (precheck only).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub field_groups: Vec<String>,
}

/// `OrderDuration` object.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderDuration {
    /// Duration type; always `DayOrder` for market orders.
    pub duration_type: String,
    /// Expiry for `GoodTillDate`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date_time: Option<String>,
}

impl OrderRequest {
    /// Build the placement body for an intention.
    #[must_use]
    pub fn from_intention(intention: &OrderIntention) -> Self {
        let duration = intention.effective_duration();
        let expiration_date_time = match duration {
            DurationType::GoodTillDate => intention
                .expires_at()
                .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true)),
            _ => None,
        };

        Self {
            account_key: intention.account_key().as_str().to_string(),
            amount: intention.quantity().amount(),
            asset_type: intention.instrument().asset_type.as_str().to_string(),
            buy_sell: intention.side().as_str().to_string(),
            uic: intention.instrument().uic,
            order_type: intention.order_type().as_str().to_string(),
            order_duration: OrderDuration {
                duration_type: duration.as_str().to_string(),
                expiration_date_time,
            },
            manual_order: intention.manual_order(),
            external_reference: intention
                .external_reference()
                .map(|r| r.as_str().to_string()),
            field_groups: Vec::new(),
        }
    }

    /// Build the precheck body for an intention.
    #[must_use]
    pub fn precheck(intention: &OrderIntention) -> Self {
        let mut request = Self::from_intention(intention);
        request.field_groups = PRECHECK_FIELD_GROUPS.iter().map(|g| (*g).to_string()).collect();
        request
    }
}

/// Disclaimer acceptance body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DisclaimerAcceptRequest {
    /// Context from the precheck.
    pub disclaimer_context: String,
    /// Token being accepted.
    pub disclaimer_token: String,
    /// Always `Accepted`.
    pub response_type: String,
    /// Free-text input; empty.
    pub user_input: String,
}

impl DisclaimerAcceptRequest {
    /// Accept `token` within `context`.
    pub fn accept(context: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            disclaimer_context: context.into(),
            disclaimer_token: token.into(),
            response_type: ACCEPTED_RESPONSE.to_string(),
            user_input: String::new(),
        }
    }
}

// ============================================================================
// Shared Response Types
// ============================================================================

/// `ErrorInfo` embedded in a 200 response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorInfo {
    /// Venue error code.
    #[serde(default)]
    pub error_code: Option<String>,
    /// Message.
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorInfo {
    fn into_business_error(self, default_message: &str) -> BusinessError {
        BusinessError::new(
            self.error_code.unwrap_or_else(|| "UNKNOWN".to_string()),
            self.message.unwrap_or_else(|| default_message.to_string()),
        )
    }
}

/// `{Amount, Currency}` pair.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AmountInfo {
    /// Amount.
    pub amount: Decimal,
    /// ISO currency.
    pub currency: String,
}

impl From<AmountInfo> for Money {
    fn from(info: AmountInfo) -> Self {
        Self::new(info.amount, info.currency)
    }
}

/// `{Data: [...]}` list envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataEnvelope<T> {
    /// Items.
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

fn decode<T: for<'de> Deserialize<'de>>(body: Value, what: &str) -> Result<T, TransportError> {
    serde_json::from_value(body).map_err(|e| TransportError::malformed(format!("{what}: {e}")))
}

/// Venue ids come back as strings, occasionally as numbers.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ============================================================================
// Instrument Details
// ============================================================================

/// Instrument details response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct InstrumentDetails {
    /// Tradable flag; absent means not tradable.
    pub is_tradable: Option<bool>,
    /// Reason when not tradable.
    pub non_tradable_reason: Option<String>,
    /// Display format.
    pub format: Option<FormatInfo>,
    /// Amount increment.
    pub increment_size: Option<Decimal>,
    /// Lot size.
    pub lot_size: Option<Decimal>,
    /// Minimum amount.
    pub minimum_trade_size: Option<Decimal>,
    /// Price tick.
    pub tick_size: Option<Decimal>,
    /// Supported order types.
    pub supported_order_types: Option<Vec<String>>,
    /// Durations allowed per order type.
    pub supported_order_type_settings: Option<Vec<OrderTypeSettingInfo>>,
    /// Either an object carrying `MarketState` or a plain status string.
    pub trading_status: Option<Value>,
    /// Root-level market state.
    pub market_state: Option<String>,
    /// Ticker.
    pub symbol: Option<String>,
    /// Name.
    pub description: Option<String>,
}

/// `Format` object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FormatInfo {
    /// Amount decimals.
    pub decimals: Option<u32>,
    /// Order amount decimals.
    pub order_decimals: Option<u32>,
}

/// One `SupportedOrderTypeSettings` item.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderTypeSettingInfo {
    /// Order type.
    pub order_type: String,
    /// Allowed durations.
    #[serde(default)]
    pub duration_types: Vec<String>,
}

impl InstrumentDetails {
    /// Decode a details body.
    pub fn parse(body: Value) -> Result<Self, TransportError> {
        if !body.is_object() {
            return Err(TransportError::malformed("instrument details: expected an object"));
        }
        decode(body, "instrument details")
    }

    fn market_state(&self) -> Option<MarketState> {
        self.trading_status
            .as_ref()
            .and_then(|status| status.get("MarketState"))
            .and_then(Value::as_str)
            .or(self.market_state.as_deref())
            .map(MarketState::parse)
    }

    /// Convert into domain constraints. Unknown order and duration types
    /// are dropped.
    #[must_use]
    pub fn into_constraints(self, instrument: InstrumentKey) -> InstrumentConstraints {
        let market_state = self.market_state();
        let mut constraints = InstrumentConstraints::minimal(
            instrument,
            self.is_tradable.unwrap_or(false),
            market_state,
        );

        constraints.non_tradable_reason = self.non_tradable_reason;
        constraints.amount_decimals = self
            .format
            .as_ref()
            .and_then(|f| f.decimals.or(f.order_decimals));
        constraints.increment_size = self.increment_size;
        constraints.lot_size = self.lot_size;
        constraints.minimum_trade_size = self.minimum_trade_size;
        constraints.tick_size = self.tick_size;
        constraints.supported_order_types = self
            .supported_order_types
            .map(|types| types.iter().filter_map(|t| t.parse().ok()).collect());
        constraints.order_type_settings = self.supported_order_type_settings.map(|settings| {
            settings
                .into_iter()
                .filter_map(|s| {
                    Some(OrderTypeSetting {
                        order_type: s.order_type.parse().ok()?,
                        duration_types: s
                            .duration_types
                            .iter()
                            .filter_map(|d| d.parse().ok())
                            .collect(),
                    })
                })
                .collect()
        });
        constraints.symbol = self.symbol;
        constraints.description = self.description;
        constraints
    }
}

// ============================================================================
// Net Positions
// ============================================================================

/// One net position item.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetPositionItem {
    /// Position id.
    #[serde(default)]
    pub net_position_id: Option<String>,
    /// Identity and size.
    pub net_position_base: NetPositionBase,
    /// Valuation.
    #[serde(default)]
    pub net_position_view: Option<NetPositionView>,
}

/// `NetPositionBase` object.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetPositionBase {
    /// Asset class.
    pub asset_type: String,
    /// Instrument code.
    pub uic: u32,
    /// Account.
    #[serde(default)]
    pub account_key: Option<String>,
    /// Signed net amount.
    pub amount: Decimal,
    /// Whether the venue allows closing it.
    #[serde(default = "default_true")]
    pub can_be_closed: bool,
    /// Currency.
    #[serde(default)]
    pub currency: Option<String>,
}

const fn default_true() -> bool {
    true
}

/// `NetPositionView` object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct NetPositionView {
    /// Average open price.
    pub average_open_price: Option<Decimal>,
    /// Market value.
    pub market_value: Option<Decimal>,
    /// Unrealized P/L.
    pub profit_loss_on_trade: Option<Decimal>,
    /// Exposure currency.
    pub exposure_currency: Option<String>,
}

/// Decode a net positions body. Positions in asset classes the pipeline
/// does not trade are skipped.
pub fn parse_net_positions(body: Value) -> Result<Vec<Position>, TransportError> {
    let envelope: DataEnvelope<NetPositionItem> = decode(body, "net positions")?;

    let mut positions = Vec::with_capacity(envelope.data.len());
    for item in envelope.data {
        let base = item.net_position_base;
        let Ok(asset_type) = base.asset_type.parse() else {
            tracing::debug!(asset_type = %base.asset_type, uic = base.uic, "Skipping position");
            continue;
        };
        let view = item.net_position_view.unwrap_or_default();

        let mut position = Position::new(InstrumentKey::new(asset_type, base.uic), base.amount);
        position.position_id = item.net_position_id;
        position.account_key = base.account_key.map(AccountKey::new);
        position.average_open_price = view.average_open_price;
        position.market_value = view.market_value;
        position.unrealized_pnl = view.profit_loss_on_trade;
        position.currency = base.currency.or(view.exposure_currency);
        position.can_be_closed = base.can_be_closed;
        positions.push(position);
    }
    Ok(positions)
}

// ============================================================================
// Precheck
// ============================================================================

/// Precheck response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PrecheckResponse {
    /// Rejection.
    pub error_info: Option<ErrorInfo>,
    /// Estimated cost.
    pub estimated_cost: Option<AmountInfo>,
    /// Margin impact.
    pub margin_impact_buy_sell: Option<AmountInfo>,
    /// Older name for the margin impact.
    pub margin_impact: Option<AmountInfo>,
    /// Disclaimers to resolve.
    pub pre_trade_disclaimers: Option<PreTradeDisclaimers>,
}

/// `PreTradeDisclaimers` object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PreTradeDisclaimers {
    /// Context echoed back on acceptance.
    pub disclaimer_context: String,
    /// Tokens.
    pub disclaimer_tokens: Vec<String>,
}

/// Decode a precheck body.
pub fn parse_precheck(
    body: Value,
    request_id: RequestId,
) -> Result<PrecheckOutcome, TransportError> {
    if !body.is_object() {
        return Err(TransportError::malformed("precheck: expected an object"));
    }
    let response: PrecheckResponse = decode(body, "precheck")?;

    let outcome = if let Some(info) = response.error_info {
        PrecheckOutcome::rejected(info.into_business_error("No message provided"))
    } else {
        let margin = response.margin_impact_buy_sell.or(response.margin_impact);
        let disclaimers = response.pre_trade_disclaimers.map(|d| DisclaimerBundle {
            context: d.disclaimer_context,
            tokens: d.disclaimer_tokens,
        });
        PrecheckOutcome::accepted(
            response.estimated_cost.map(Money::from),
            margin.map(Money::from),
            disclaimers,
        )
    };
    Ok(outcome.with_request_id(Some(request_id)))
}

// ============================================================================
// Disclaimers
// ============================================================================

/// One disclaimer details item.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DisclaimerDetails {
    /// Token.
    pub disclaimer_token: String,
    /// Absent means blocking.
    #[serde(default)]
    pub is_blocking: Option<bool>,
    /// Title.
    #[serde(default)]
    pub title: String,
    /// Body.
    #[serde(default)]
    pub body: String,
    /// Offered responses, strings or `{ResponseType}` objects.
    #[serde(default)]
    pub response_options: Vec<Value>,
    /// Conditions needing user input.
    #[serde(default)]
    pub conditions: Vec<Value>,
}

fn option_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other
            .get("ResponseType")
            .and_then(Value::as_str)
            .map_or_else(|| other.to_string(), str::to_string),
    }
}

impl From<DisclaimerDetails> for DisclaimerRecord {
    fn from(details: DisclaimerDetails) -> Self {
        Self {
            token: details.disclaimer_token,
            is_blocking: details.is_blocking.unwrap_or(true),
            title: details.title,
            body: details.body,
            response_options: details.response_options.iter().map(option_label).collect(),
            conditions: details.conditions.iter().map(Value::to_string).collect(),
        }
    }
}

/// Decode a disclaimer details body; `None` when `Data` is empty.
pub fn parse_disclaimer(body: Value) -> Result<Option<DisclaimerRecord>, TransportError> {
    let envelope: DataEnvelope<DisclaimerDetails> = decode(body, "disclaimer details")?;
    Ok(envelope.data.into_iter().next().map(DisclaimerRecord::from))
}

// ============================================================================
// Placement
// ============================================================================

/// Decode a placement body: `OrderId` at the root, else `Orders[0].OrderId`.
pub fn parse_placement(body: &Value, request_id: RequestId) -> Result<PlacementReply, TransportError> {
    let Some(object) = body.as_object() else {
        return Err(TransportError::malformed("placement: expected an object"));
    };

    let error = match object.get("ErrorInfo") {
        Some(info) => Some(
            serde_json::from_value::<ErrorInfo>(info.clone())
                .map_err(|e| TransportError::malformed(format!("placement ErrorInfo: {e}")))?
                .into_business_error("No message"),
        ),
        None => None,
    };

    let order_id = object
        .get("OrderId")
        .and_then(id_string)
        .or_else(|| {
            object
                .get("Orders")
                .and_then(Value::as_array)
                .and_then(|orders| orders.first())
                .and_then(|first| first.get("OrderId"))
                .and_then(id_string)
        })
        .map(OrderId::new);

    Ok(PlacementReply {
        order_id,
        error,
        request_id: Some(request_id),
    })
}

// ============================================================================
// Order Ledger
// ============================================================================

/// Order ledger row, as far as reconciliation reads it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LedgerRow {
    order_id: Value,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    external_reference: Option<String>,
    #[serde(default)]
    uic: Option<u32>,
    #[serde(default)]
    asset_type: Option<String>,
    #[serde(default)]
    buy_sell: Option<String>,
    #[serde(default)]
    amount: Option<Decimal>,
    #[serde(default)]
    filled_amount: Option<Decimal>,
    #[serde(default)]
    price: Option<Decimal>,
    #[serde(default)]
    order_time: Option<DateTime<Utc>>,
}

/// Decode one ledger row, keeping the raw JSON.
pub fn parse_ledger_order(raw: Value) -> Result<LedgerOrder, TransportError> {
    let row: LedgerRow = decode(raw.clone(), "ledger order")?;
    let order_id = id_string(&row.order_id)
        .ok_or_else(|| TransportError::malformed("ledger order: OrderId missing"))?;

    let instrument = match (row.asset_type.as_deref().map(str::parse::<AssetType>), row.uic) {
        (Some(Ok(asset_type)), Some(uic)) => Some(InstrumentKey::new(asset_type, uic)),
        _ => None,
    };

    Ok(LedgerOrder {
        order_id: OrderId::new(order_id),
        status: row.status.unwrap_or_else(|| "Unknown".to_string()),
        external_reference: row.external_reference,
        instrument,
        side: row.buy_sell.and_then(|side| side.parse().ok()),
        amount: row.amount,
        filled_amount: row.filled_amount,
        price: row.price,
        order_time: row.order_time,
        raw,
    })
}

/// Decode a ledger list body.
pub fn parse_ledger_orders(body: Value) -> Result<Vec<LedgerOrder>, TransportError> {
    let envelope: DataEnvelope<Value> = decode(body, "orders")?;
    envelope.data.into_iter().map(parse_ledger_order).collect()
}
