//! Correlation strings (`ExternalReference`) tying venue orders back to a
//! logical trade attempt.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

use crate::domain::order_execution::value_objects::OrderSide;
use crate::domain::shared::{DomainError, InstrumentKey};

/// Correlation string sent as the venue's `ExternalReference`.
///
/// At most [`ExternalReference::MAX_LEN`] characters and never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExternalReference(String);

impl ExternalReference {
    /// Maximum length the venue stores.
    pub const MAX_LEN: usize = 50;

    /// Validate and wrap a correlation string.
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.is_empty() {
            return Err(DomainError::invalid_value(
                "external_reference",
                "must not be empty",
            ));
        }
        if value.chars().count() > Self::MAX_LEN {
            return Err(DomainError::BusinessRuleViolation {
                rule: "external_reference_max_length".to_string(),
                message: format!(
                    "{} characters exceeds the limit of {}",
                    value.chars().count(),
                    Self::MAX_LEN
                ),
            });
        }
        Ok(Self(value))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ExternalReference {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ExternalReference> for String {
    fn from(value: ExternalReference) -> Self {
        value.0
    }
}

impl fmt::Display for ExternalReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive a fresh correlation string for an intention.
///
/// Layout is `{strategy}:{uic}:{yyyymmddHHMMSS}:{hash}` where `hash` is the
/// first 8 hex digits of SHA-256 over strategy, instrument, side, quantity,
/// the timestamp, and a random nonce. Every call yields a new reference, so
/// two intentions never share one by accident. The strategy segment is
/// sanitized and truncated so the whole string fits
/// [`ExternalReference::MAX_LEN`].
#[must_use]
pub fn generate_external_reference(
    strategy_id: &str,
    instrument: &InstrumentKey,
    side: OrderSide,
    quantity: Decimal,
    at: DateTime<Utc>,
) -> ExternalReference {
    let stamp = at.format("%Y%m%d%H%M%S").to_string();
    let nonce = Uuid::new_v4();

    let mut hasher = Sha256::new();
    hasher.update(
        format!(
            "{strategy_id}|{instrument}|{side}|{quantity}|{}|{nonce}",
            at.timestamp_nanos_opt().unwrap_or_default()
        )
        .as_bytes(),
    );
    let digest = hasher.finalize();
    let hash = hex::encode(&digest[..4]);

    let tail = format!(":{}:{stamp}:{hash}", instrument.uic);
    let budget = ExternalReference::MAX_LEN - tail.len();

    let mut strategy: String = strategy_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .take(budget)
        .collect();
    if strategy.is_empty() {
        strategy.push_str("pipeline");
    }

    // tail is ASCII and strategy was capped to the remaining budget
    ExternalReference(format!("{strategy}{tail}"))
}
