//! Per-stage pipeline configuration.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::services::{
    DISCLAIMER_CACHE_TTL, INSTRUMENT_CACHE_TTL, POSITIONS_CACHE_TTL, PrecheckRetry,
    TRADE_NOT_COMPLETED,
};
use crate::domain::disclaimer::DisclaimerPolicy;
use crate::domain::position::{DuplicateBuyPolicy, GuardPolicy};

/// Instrument validation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentsConfig {
    /// Constraint cache lifetime.
    pub cache_ttl_secs: u64,
}

impl Default for InstrumentsConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: INSTRUMENT_CACHE_TTL.as_secs(),
        }
    }
}

/// Position guard configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionsConfig {
    /// Position snapshot lifetime.
    pub cache_ttl_secs: u64,
    /// `block`, `warn`, or `allow`.
    pub duplicate_buy_policy: DuplicateBuyPolicy,
    /// Allow buys that reduce a short.
    pub allow_short_covering: bool,
    /// Fail closed when positions are unavailable.
    pub block_on_position_failure: bool,
}

impl Default for PositionsConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: POSITIONS_CACHE_TTL.as_secs(),
            duplicate_buy_policy: DuplicateBuyPolicy::Block,
            allow_short_covering: false,
            block_on_position_failure: true,
        }
    }
}

impl PositionsConfig {
    /// Guard policy for the guard service.
    #[must_use]
    pub const fn guard_policy(&self) -> GuardPolicy {
        GuardPolicy {
            duplicate_buy: self.duplicate_buy_policy,
            allow_short_covering: self.allow_short_covering,
            block_on_position_failure: self.block_on_position_failure,
        }
    }
}

/// Precheck retry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrecheckConfig {
    /// Whole-precheck retries on transient failures.
    pub max_retries: u32,
    /// Backoff base; attempt `n` waits `base * 2^n`.
    pub backoff_base_ms: u64,
}

impl Default for PrecheckConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            backoff_base_ms: 2000,
        }
    }
}

impl PrecheckConfig {
    /// Retry settings for the precheck service.
    #[must_use]
    pub const fn retry(&self) -> PrecheckRetry {
        PrecheckRetry {
            max_retries: self.max_retries,
            backoff_base: Duration::from_millis(self.backoff_base_ms),
        }
    }
}

/// Disclaimer resolution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisclaimersConfig {
    /// `block_all`, `auto_accept_normal`, or `manual_review`.
    pub policy: DisclaimerPolicy,
    /// Details cache lifetime.
    pub cache_ttl_secs: u64,
}

impl Default for DisclaimersConfig {
    fn default() -> Self {
        Self {
            policy: DisclaimerPolicy::BlockAll,
            cache_ttl_secs: DISCLAIMER_CACHE_TTL.as_secs(),
        }
    }
}

/// Placement configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Skip the real placement call.
    pub dry_run: bool,
    /// Embedded error codes that mean "outcome unknown".
    pub ambiguous_error_codes: Vec<String>,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            dry_run: true,
            ambiguous_error_codes: vec![TRADE_NOT_COMPLETED.to_string()],
        }
    }
}

/// Orchestration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Strategy id mixed into generated correlation strings.
    pub strategy_id: String,
    /// Quantity for mapped buy signals.
    pub default_quantity: Decimal,
    /// Deadline for one Execute call.
    pub pipeline_timeout_secs: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            strategy_id: "pipeline".to_string(),
            default_quantity: Decimal::ONE,
            pipeline_timeout_secs: 120,
        }
    }
}
