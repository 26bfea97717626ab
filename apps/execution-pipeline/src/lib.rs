// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Execution Pipeline - Rust Core Library
//!
//! Order-execution pipeline for a rate-limited brokerage REST venue.
//! An order intention passes through instrument validation, position
//! guards, a non-binding precheck, disclaimer resolution, and idempotent
//! placement. Ambiguous placements are reconciled against the venue's
//! order ledger by correlation string.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Core business logic (value objects, pure decisions)
//!   - `order_execution`: Intention, correlation string, outcomes, ledger rows
//!   - `instrument`: Trading constraints and market state
//!   - `position`: Net holdings and buy/sell guards
//!   - `disclaimer`: Pre-trade disclaimers and acceptance policy
//!
//! - **Application**: Use cases and orchestration
//!   - `ports`: Interfaces for external systems (`VenuePort`, `SubmissionRepository`)
//!   - `services`: One service per pipeline stage
//!   - `use_cases`: `ExecutionOrchestrator`, `IntentionMapper`
//!   - `dto`: Data transfer objects for API boundaries
//!
//! - **Infrastructure**: Adapters (implementations)
//!   - `broker::saxo`: REST transport with rate limiting and retries
//!   - `persistence`: In-memory submission ledger
//!   - `config`: Dependency injection container

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Cross-cutting
// =============================================================================

/// YAML configuration with environment interpolation.
pub mod config;

/// Prometheus metrics.
pub mod observability;

/// Tracing subscriber and OpenTelemetry export.
pub mod telemetry;

// =============================================================================
// Re-exports from Clean Architecture
// =============================================================================

// Domain re-exports
pub use domain::order_execution::{
    DurationType, ExecutionStatus, ExternalReference, OrderIntention, OrderSide, OrderType,
};
pub use domain::shared::{
    AccountKey, AssetType, ClientKey, InstrumentKey, Money, OrderId, Quantity, RequestId,
};

// Application re-exports
pub use application::dto::{ExecutionResult, OrderIntentionDto};
pub use application::ports::{SubmissionRepository, VenueError, VenuePort};
pub use application::use_cases::{ExecutionOrchestrator, IntentionMapper, PipelineError};

// Infrastructure re-exports
pub use infrastructure::broker::saxo::{
    SaxoConfig, SaxoEnvironment, SaxoVenueAdapter, TransportError,
};
pub use infrastructure::config::{Container, SaxoContainer};
pub use infrastructure::persistence::InMemorySubmissionRepository;
