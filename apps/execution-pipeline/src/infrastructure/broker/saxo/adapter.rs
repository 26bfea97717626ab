//! Saxo venue adapter implementing VenuePort.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::application::ports::{
    CredentialProvider, PlacementReply, VenueError, VenuePort,
};
use crate::domain::disclaimer::DisclaimerRecord;
use crate::domain::instrument::InstrumentConstraints;
use crate::domain::order_execution::{LedgerOrder, OrderIntention, PrecheckOutcome};
use crate::domain::position::Position;
use crate::domain::shared::{AccountKey, ClientKey, InstrumentKey, OrderId};

use super::api_types::{
    DisclaimerAcceptRequest, INSTRUMENT_FIELD_GROUPS, InstrumentDetails,
    NET_POSITION_FIELD_GROUPS, OrderRequest, parse_disclaimer, parse_ledger_orders,
    parse_net_positions, parse_placement, parse_precheck,
};
use super::config::SaxoConfig;
use super::error::TransportError;
use super::http_client::{RetryMode, SaxoHttpClient};
use super::rate_limit::EndpointCategory;

const NET_POSITIONS_PATH: &str = "/port/v1/netpositions";
const PRECHECK_PATH: &str = "/trade/v2/orders/precheck";
const ORDERS_PATH: &str = "/trade/v2/orders";
const DISCLAIMERS_PATH: &str = "/dm/v2/disclaimers";
const LEDGER_PATH: &str = "/port/v1/orders";

/// Saxo OpenAPI venue adapter.
///
/// Precheck is retried like a read; disclaimer acceptance and placement are
/// retried on 429 only.
#[derive(Debug)]
pub struct SaxoVenueAdapter {
    client: SaxoHttpClient,
}

impl SaxoVenueAdapter {
    /// Create a new adapter.
    pub fn new(
        config: &SaxoConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, TransportError> {
        tracing::info!(base_url = %config.base_url, "Creating Saxo venue adapter");
        Ok(Self {
            client: SaxoHttpClient::new(config, credentials)?,
        })
    }

    /// Underlying HTTP client.
    #[must_use]
    pub const fn http(&self) -> &SaxoHttpClient {
        &self.client
    }

    fn to_body<T: Serialize>(value: &T) -> Result<Value, TransportError> {
        serde_json::to_value(value).map_err(|e| TransportError::Request(e.to_string()))
    }
}

#[async_trait]
impl VenuePort for SaxoVenueAdapter {
    async fn instrument_details(
        &self,
        instrument: &InstrumentKey,
        account_key: Option<&AccountKey>,
    ) -> Result<InstrumentConstraints, VenueError> {
        let path = format!(
            "/ref/v1/instruments/details/{}/{}",
            instrument.uic,
            instrument.asset_type.as_str()
        );
        let mut query = vec![("FieldGroups", INSTRUMENT_FIELD_GROUPS.to_string())];
        if let Some(account) = account_key {
            query.push(("AccountKey", account.as_str().to_string()));
        }

        let response = self
            .client
            .get(EndpointCategory::RefData, &path, &query)
            .await
            .map_err(|e| match e {
                TransportError::Remote { status: 404, .. } => VenueError::NotFound {
                    what: format!("instrument {instrument}"),
                },
                other => other.into(),
            })?;

        Ok(InstrumentDetails::parse(response.body)?.into_constraints(*instrument))
    }

    async fn net_positions(&self, client_key: &ClientKey) -> Result<Vec<Position>, VenueError> {
        let query = [
            ("ClientKey", client_key.as_str().to_string()),
            ("FieldGroups", NET_POSITION_FIELD_GROUPS.to_string()),
        ];
        let response = self
            .client
            .get(EndpointCategory::Portfolio, NET_POSITIONS_PATH, &query)
            .await?;

        let positions = parse_net_positions(response.body)?;
        tracing::debug!(client_key = %client_key, count = positions.len(), "Fetched net positions");
        Ok(positions)
    }

    async fn precheck_order(
        &self,
        order: &OrderIntention,
    ) -> Result<PrecheckOutcome, VenueError> {
        let body = Self::to_body(&OrderRequest::precheck(order))?;
        let response = self
            .client
            .post(EndpointCategory::Precheck, PRECHECK_PATH, &body, RetryMode::Idempotent)
            .await?;

        Ok(parse_precheck(response.body, response.request_id)?)
    }

    async fn disclaimer_details(&self, token: &str) -> Result<DisclaimerRecord, VenueError> {
        let query = [("DisclaimerTokens", token.to_string())];
        let response = self
            .client
            .get(EndpointCategory::Disclaimers, DISCLAIMERS_PATH, &query)
            .await?;

        parse_disclaimer(response.body)?.ok_or_else(|| VenueError::NotFound {
            what: format!("disclaimer {token}"),
        })
    }

    async fn accept_disclaimer(&self, context: &str, token: &str) -> Result<(), VenueError> {
        let body = Self::to_body(&DisclaimerAcceptRequest::accept(context, token))?;
        self.client
            .post(
                EndpointCategory::Disclaimers,
                DISCLAIMERS_PATH,
                &body,
                RetryMode::RateLimitOnly,
            )
            .await?;
        Ok(())
    }

    async fn place_order(&self, order: &OrderIntention) -> Result<PlacementReply, VenueError> {
        let request = OrderRequest::from_intention(order);
        tracing::info!(
            external_reference = ?request.external_reference,
            uic = request.uic,
            asset_type = %request.asset_type,
            side = %request.buy_sell,
            amount = %request.amount,
            "Placing order"
        );

        let body = Self::to_body(&request)?;
        let response = self
            .client
            .post(EndpointCategory::Orders, ORDERS_PATH, &body, RetryMode::RateLimitOnly)
            .await?;

        Ok(parse_placement(&response.body, response.request_id)?)
    }

    async fn order_by_id(
        &self,
        client_key: &ClientKey,
        order_id: &OrderId,
    ) -> Result<Option<LedgerOrder>, VenueError> {
        let query = [
            ("ClientKey", client_key.as_str().to_string()),
            ("OrderId", order_id.as_str().to_string()),
        ];
        let response = match self
            .client
            .get(EndpointCategory::Portfolio, LEDGER_PATH, &query)
            .await
        {
            Ok(response) => response,
            Err(TransportError::Remote { status: 404, .. }) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let orders = parse_ledger_orders(response.body)?;
        Ok(orders.into_iter().find(|o| &o.order_id == order_id))
    }

    async fn recent_orders(
        &self,
        client_key: &ClientKey,
        limit: usize,
    ) -> Result<Vec<LedgerOrder>, VenueError> {
        let query = [
            ("ClientKey", client_key.as_str().to_string()),
            ("Status", "All".to_string()),
            ("$top", limit.to_string()),
        ];
        let response = self
            .client
            .get(EndpointCategory::Portfolio, LEDGER_PATH, &query)
            .await?;

        let mut orders = parse_ledger_orders(response.body)?;
        // Newest first; rows without a timestamp keep venue order at the end.
        orders.sort_by(|a, b| b.order_time.cmp(&a.order_time));
        orders.truncate(limit);
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rust_decimal_macros::dec;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::domain::instrument::MarketState;
    use crate::domain::order_execution::{ExternalReference, OrderSide};
    use crate::domain::shared::{AssetType, Quantity};
    use crate::infrastructure::broker::saxo::{RetryPolicy, StaticCredentials};

    fn adapter(server: &MockServer) -> SaxoVenueAdapter {
        let retry = RetryPolicy {
            base_backoff: Duration::from_millis(1),
            min_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            ..RetryPolicy::default()
        };
        let config = SaxoConfig::with_base_url(server.uri()).with_retry(retry);
        SaxoVenueAdapter::new(&config, Arc::new(StaticCredentials::new("tok"))).unwrap()
    }

    fn intention() -> OrderIntention {
        OrderIntention::market(
            AccountKey::new("acc"),
            ClientKey::new("cli"),
            InstrumentKey::new(AssetType::Stock, 211),
            OrderSide::Buy,
            Quantity::new(dec!(5)).unwrap(),
        )
        .with_external_reference(ExternalReference::new("E-1").unwrap())
    }

    #[tokio::test]
    async fn test_instrument_details_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ref/v1/instruments/details/211/Stock"))
            .and(query_param("FieldGroups", INSTRUMENT_FIELD_GROUPS))
            .and(query_param("AccountKey", "acc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "IsTradable": true,
                "TradingStatus": {"MarketState": "Open"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let constraints = adapter(&server)
            .instrument_details(
                &InstrumentKey::new(AssetType::Stock, 211),
                Some(&AccountKey::new("acc")),
            )
            .await
            .unwrap();
        assert!(constraints.tradable);
        assert_eq!(constraints.market_state, Some(MarketState::Open));
    }

    #[tokio::test]
    async fn test_instrument_404_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = adapter(&server)
            .instrument_details(&InstrumentKey::new(AssetType::Stock, 9), None)
            .await
            .unwrap_err();
        assert!(matches!(err, VenueError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_precheck_posts_field_groups() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PRECHECK_PATH))
            .and(body_partial_json(json!({
                "FieldGroups": ["Costs", "MarginImpactBuySell"],
                "ExternalReference": "E-1",
                "Amount": 5
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "EstimatedCost": {"Amount": 1.5, "Currency": "USD"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = adapter(&server).precheck_order(&intention()).await.unwrap();
        assert!(outcome.success);
        assert!(outcome.request_id.is_some());
    }

    #[tokio::test]
    async fn test_accept_disclaimer_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(DISCLAIMERS_PATH))
            .and(body_partial_json(json!({
                "DisclaimerContext": "ctx",
                "DisclaimerToken": "t1",
                "ResponseType": "Accepted",
                "UserInput": ""
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        adapter(&server).accept_disclaimer("ctx", "t1").await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_disclaimer_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DISCLAIMERS_PATH))
            .and(query_param("DisclaimerTokens", "t9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Data": []})))
            .mount(&server)
            .await;

        let err = adapter(&server).disclaimer_details("t9").await.unwrap_err();
        assert!(matches!(err, VenueError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_placement_server_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ORDERS_PATH))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let err = adapter(&server).place_order(&intention()).await.unwrap_err();
        assert!(matches!(err, VenueError::Remote { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_placement_reply_carries_request_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ORDERS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"OrderId": "900"})))
            .mount(&server)
            .await;

        let reply = adapter(&server).place_order(&intention()).await.unwrap();
        assert_eq!(reply.order_id, Some(OrderId::new("900")));
        assert!(reply.error.is_none());
        assert!(reply.request_id.is_some());
    }

    #[tokio::test]
    async fn test_order_by_id_404_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(LEDGER_PATH))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let found = adapter(&server)
            .order_by_id(&ClientKey::new("cli"), &OrderId::new("1"))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_recent_orders_sorted_newest_first() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(LEDGER_PATH))
            .and(query_param("Status", "All"))
            .and(query_param("$top", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Data": [
                {"OrderId": "1", "Status": "Filled", "OrderTime": "2026-01-01T10:00:00Z"},
                {"OrderId": "2", "Status": "Working", "OrderTime": "2026-01-01T12:00:00Z"},
                {"OrderId": "3", "Status": "Working"}
            ]})))
            .mount(&server)
            .await;

        let orders = adapter(&server)
            .recent_orders(&ClientKey::new("cli"), 2)
            .await
            .unwrap();
        let ids: Vec<&str> = orders.iter().map(|o| o.order_id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1"]);
    }
}
