//! HTTP client wrapper with rate-limit tracking and retry logic.

use std::sync::Arc;

use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::Value;

use super::config::SaxoConfig;
use super::error::TransportError;
use super::rate_limit::{EndpointCategory, RateLimitTracker, parse_header_map};
use super::retry::{RetryPolicy, StatusClass, classify_status, parse_retry_after};
use crate::application::ports::{CredentialProvider, RateLimitSnapshot};
use crate::domain::shared::RequestId;
use crate::observability::record_transport_retry;

const REQUEST_ID_HEADER: &str = "x-request-id";
const ERROR_EXCERPT_LEN: usize = 200;

/// Which failures a request may be retried on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryMode {
    /// Reads and other safe calls: 429, 5xx and network failures.
    Idempotent,
    /// Side-effecting calls: only 429, which the venue rejects before
    /// doing any work.
    RateLimitOnly,
}

/// A successful venue response.
#[derive(Debug, Clone)]
pub struct VenueResponse {
    /// HTTP status.
    pub status: u16,
    /// Parsed JSON body (`Null` when empty).
    pub body: Value,
    /// Rate-limit headers of the response.
    pub rate_limits: RateLimitSnapshot,
    /// `x-request-id` the successful attempt was sent with.
    pub request_id: RequestId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorBody {
    error_code: Option<String>,
    message: Option<String>,
    error_info: Option<Box<ErrorBody>>,
}

/// HTTP client for the Saxo OpenAPI with bearer auth, per-attempt request
/// ids, throttling, and retries.
pub struct SaxoHttpClient {
    client: Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
    retry: RetryPolicy,
    limits: RateLimitTracker,
}

impl std::fmt::Debug for SaxoHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaxoHttpClient")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl SaxoHttpClient {
    /// Create a new HTTP client from config.
    pub fn new(
        config: &SaxoConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            credentials,
            retry: config.retry.clone(),
            limits: RateLimitTracker::new(config.min_intervals.clone()),
        })
    }

    /// Rate-limit tracker shared by every request of this client.
    #[must_use]
    pub const fn rate_limits(&self) -> &RateLimitTracker {
        &self.limits
    }

    /// GET with query parameters. Always idempotent.
    pub async fn get(
        &self,
        category: EndpointCategory,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<VenueResponse, TransportError> {
        self.execute(Method::GET, category, path, query, None, RetryMode::Idempotent)
            .await
    }

    /// POST a JSON body.
    pub async fn post(
        &self,
        category: EndpointCategory,
        path: &str,
        body: &Value,
        mode: RetryMode,
    ) -> Result<VenueResponse, TransportError> {
        self.execute(Method::POST, category, path, &[], Some(body), mode)
            .await
    }

    /// Send one logical request, retrying per `mode`.
    ///
    /// Every physical attempt carries a fresh `x-request-id`.
    pub async fn execute(
        &self,
        method: Method,
        category: EndpointCategory,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
        mode: RetryMode,
    ) -> Result<VenueResponse, TransportError> {
        let url = format!("{}{path}", self.base_url);
        let mut attempt: u32 = 0;

        loop {
            self.limits.throttle(category).await;
            let token = self.credentials.bearer_token().await?;
            let request_id = RequestId::generate();

            let mut request = self
                .client
                .request(method.clone(), &url)
                .bearer_auth(token)
                .header(REQUEST_ID_HEADER, request_id.as_str());
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(b) = body {
                request = request.json(b);
            }

            let response = match request.send().await {
                Ok(resp) => resp,
                Err(e) => {
                    let err = TransportError::from(e);
                    if mode == RetryMode::Idempotent && attempt < self.retry.max_retries {
                        let delay = self.retry.exponential_delay(attempt);
                        let reason = if matches!(err, TransportError::Transient { timeout: true, .. }) {
                            "timeout"
                        } else {
                            "network"
                        };
                        tracing::warn!(
                            error = %err,
                            category = %category,
                            delay_ms = delay.as_millis(),
                            attempt = attempt + 1,
                            request_id = %request_id,
                            "Network error, retrying"
                        );
                        record_transport_retry(category.as_str(), reason);
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(err);
                }
            };

            let status = response.status().as_u16();
            let rate_limits = parse_header_map(response.headers());
            self.limits.record(category, &rate_limits);
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);

            let text = response.text().await?;

            match classify_status(status) {
                StatusClass::Success => {
                    let body = if text.trim().is_empty() {
                        Value::Null
                    } else {
                        serde_json::from_str(&text).map_err(|e| {
                            TransportError::malformed(format!("{method} {path}: {e}"))
                        })?
                    };
                    tracing::debug!(
                        method = %method,
                        path,
                        status,
                        request_id = %request_id,
                        "Venue request succeeded"
                    );
                    return Ok(VenueResponse {
                        status,
                        body,
                        rate_limits,
                        request_id,
                    });
                }
                StatusClass::RateLimited => {
                    if attempt < self.retry.max_retries {
                        let delay = self.retry.compute_delay(attempt, retry_after, &rate_limits);
                        tracing::warn!(
                            category = %category,
                            delay_ms = delay.as_millis(),
                            attempt = attempt + 1,
                            request_id = %request_id,
                            "Rate limited, retrying"
                        );
                        record_transport_retry(category.as_str(), "rate_limited");
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(TransportError::RateLimited {
                        attempts: attempt + 1,
                        rate_limits,
                    });
                }
                StatusClass::Retryable
                    if mode == RetryMode::Idempotent && attempt < self.retry.max_retries =>
                {
                    let delay = self.retry.compute_delay(attempt, retry_after, &rate_limits);
                    tracing::warn!(
                        category = %category,
                        status,
                        delay_ms = delay.as_millis(),
                        attempt = attempt + 1,
                        request_id = %request_id,
                        "Server error, retrying"
                    );
                    record_transport_retry(category.as_str(), "server_error");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                StatusClass::Authentication => {
                    tracing::error!(status, path, "Venue rejected credentials");
                    return Err(TransportError::Authentication { status });
                }
                StatusClass::Retryable | StatusClass::NonRetryable => {
                    return Err(remote_error(status, &text, rate_limits));
                }
            }
        }
    }
}

/// Build a `Remote` error from an error body, `{ErrorCode, Message}` at the
/// root or under `ErrorInfo`.
fn remote_error(status: u16, text: &str, rate_limits: RateLimitSnapshot) -> TransportError {
    let parsed = serde_json::from_str::<ErrorBody>(text).ok();
    let (error_code, message) = match parsed {
        Some(ErrorBody {
            error_info: Some(info),
            ..
        }) => (info.error_code, info.message),
        Some(body) => (body.error_code, body.message),
        None => (None, None),
    };

    TransportError::Remote {
        status,
        error_code,
        message: message.unwrap_or_else(|| excerpt(text)),
        rate_limits,
    }
}

fn excerpt(text: &str) -> String {
    text.chars().take(ERROR_EXCERPT_LEN).collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;
    use wiremock::matchers::{header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    use super::*;
    use crate::application::ports::CredentialError;
    use crate::infrastructure::broker::saxo::StaticCredentials;

    struct NoCredentials;

    #[async_trait]
    impl CredentialProvider for NoCredentials {
        async fn bearer_token(&self) -> Result<String, CredentialError> {
            Err(CredentialError::Missing("token".into()))
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            base_backoff: Duration::from_millis(1),
            min_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            reset_buffer: Duration::from_millis(1),
            ..RetryPolicy::default()
        }
    }

    fn client(server: &MockServer) -> SaxoHttpClient {
        let config = SaxoConfig::with_base_url(server.uri()).with_retry(fast_retry());
        SaxoHttpClient::new(&config, Arc::new(StaticCredentials::new("tok"))).unwrap()
    }

    #[tokio::test]
    async fn test_get_sends_bearer_and_request_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/port/v1/netpositions"))
            .and(query_param("ClientKey", "cli"))
            .and(header("authorization", "Bearer tok"))
            .and(header_exists("x-request-id"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"Data": []}))
                    .insert_header("X-RateLimit-Session-Remaining", "99"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let http = client(&server);
        let response = http
            .get(
                EndpointCategory::Portfolio,
                "/port/v1/netpositions",
                &[("ClientKey", "cli".to_string())],
            )
            .await
            .unwrap();

        assert_eq!(response.body, json!({"Data": []}));
        assert_eq!(response.rate_limits.field("session", "remaining"), Some(99));
        assert!(!response.request_id.as_str().is_empty());
        let tracked = http
            .rate_limits()
            .latest(EndpointCategory::Portfolio)
            .unwrap();
        assert_eq!(tracked.field("session", "remaining"), Some(99));
    }

    #[tokio::test]
    async fn test_retries_server_error_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let response = client(&server)
            .get(EndpointCategory::RefData, "/ref", &[])
            .await
            .unwrap();
        assert_eq!(response.body["ok"], true);
    }

    #[tokio::test]
    async fn test_rate_limit_exhaustion_keeps_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("X-RateLimit-Session-Remaining", "0")
                    .insert_header("X-RateLimit-Session-Reset", "0"),
            )
            .expect(4)
            .mount(&server)
            .await;

        let err = client(&server)
            .get(EndpointCategory::RefData, "/ref", &[])
            .await
            .unwrap_err();

        match err {
            TransportError::RateLimited {
                attempts,
                rate_limits,
            } => {
                assert_eq!(attempts, 4);
                assert_eq!(rate_limits.field("session", "remaining"), Some(0));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "ErrorCode": "InvalidModelState",
                "Message": "Amount must be positive"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .post(
                EndpointCategory::Precheck,
                "/trade/v2/orders/precheck",
                &json!({}),
                RetryMode::Idempotent,
            )
            .await
            .unwrap_err();

        match err {
            TransportError::Remote {
                status,
                error_code,
                message,
                ..
            } => {
                assert_eq!(status, 400);
                assert_eq!(error_code.as_deref(), Some("InvalidModelState"));
                assert_eq!(message, "Amount must be positive");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unauthorized_is_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .get(EndpointCategory::Portfolio, "/port", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Authentication { status: 401 }));
    }

    #[tokio::test]
    async fn test_side_effecting_post_not_retried_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .post(
                EndpointCategory::Orders,
                "/trade/v2/orders",
                &json!({}),
                RetryMode::RateLimitOnly,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Remote { status: 502, .. }));
    }

    #[tokio::test]
    async fn test_side_effecting_post_retried_on_rate_limit_with_fresh_request_ids() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"OrderId": "1"})))
            .mount(&server)
            .await;

        let response = client(&server)
            .post(
                EndpointCategory::Orders,
                "/trade/v2/orders",
                &json!({"Amount": 1}),
                RetryMode::RateLimitOnly,
            )
            .await
            .unwrap();

        let requests: Vec<Request> = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        let ids: Vec<String> = requests
            .iter()
            .map(|r| {
                r.headers
                    .get("x-request-id")
                    .unwrap()
                    .to_str()
                    .unwrap()
                    .to_string()
            })
            .collect();
        assert_ne!(ids[0], ids[1]);
        assert_eq!(response.request_id.as_str(), ids[1]);
    }

    #[tokio::test]
    async fn test_invalid_json_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client(&server)
            .get(EndpointCategory::RefData, "/ref", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_empty_body_is_null() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let response = client(&server)
            .post(
                EndpointCategory::Disclaimers,
                "/dm/v2/disclaimers",
                &json!({}),
                RetryMode::RateLimitOnly,
            )
            .await
            .unwrap();
        assert_eq!(response.body, Value::Null);
        assert_eq!(response.status, 204);
    }

    #[tokio::test]
    async fn test_missing_credentials_short_circuit() {
        let server = MockServer::start().await;
        let config = SaxoConfig::with_base_url(server.uri());
        let http = SaxoHttpClient::new(&config, Arc::new(NoCredentials)).unwrap();

        let err = http
            .get(EndpointCategory::RefData, "/ref", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Credentials(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[test]
    fn test_remote_error_reads_nested_error_info() {
        let err = remote_error(
            409,
            r#"{"ErrorInfo":{"ErrorCode":"DuplicateOrder","Message":"dup"}}"#,
            RateLimitSnapshot::default(),
        );
        match err {
            TransportError::Remote {
                error_code,
                message,
                ..
            } => {
                assert_eq!(error_code.as_deref(), Some("DuplicateOrder"));
                assert_eq!(message, "dup");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
