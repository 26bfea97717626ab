//! Saxo OpenAPI Venue Adapter
//!
//! Implementation of `VenuePort` for the Saxo OpenAPI with:
//! - Bearer auth and a fresh `x-request-id` per attempt
//! - `X-RateLimit-*` tracking and per-category request spacing
//! - Retries with `Retry-After`, reset-aware, and jittered exponential delays
//! - Strict parsing of every response into domain types

mod adapter;
mod api_types;
mod config;
mod credentials;
mod error;
mod http_client;
mod rate_limit;
mod retry;

pub use adapter::SaxoVenueAdapter;
pub use config::{SaxoConfig, SaxoEnvironment};
pub use credentials::{EnvCredentials, StaticCredentials};
pub use error::TransportError;
pub use http_client::{RetryMode, SaxoHttpClient, VenueResponse};
pub use rate_limit::{EndpointCategory, RateLimitTracker, parse_rate_limit_headers};
pub use retry::{RetryPolicy, StatusClass, classify_status};
