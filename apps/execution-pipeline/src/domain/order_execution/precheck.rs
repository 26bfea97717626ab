//! Result of a non-binding dry-run submission.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::disclaimer::DisclaimerBundle;
use crate::domain::shared::{Money, RequestId};

/// A structured error embedded in an otherwise successful venue response,
/// or derived from a transport failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessError {
    /// Venue or transport error code, e.g. `InsufficientFunds` or `TIMEOUT`.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl BusinessError {
    /// Create a new error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for BusinessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Outcome of a precheck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecheckOutcome {
    /// Whether the venue would accept the order.
    pub success: bool,
    /// Rejection detail when `success` is false.
    pub error: Option<BusinessError>,
    /// Estimated total cost.
    pub estimated_cost: Option<Money>,
    /// Estimated margin impact.
    pub margin_impact: Option<Money>,
    /// Disclaimers the venue requires before trading.
    pub disclaimers: Option<DisclaimerBundle>,
    /// `x-request-id` of the attempt that produced this outcome.
    pub request_id: Option<RequestId>,
}

impl PrecheckOutcome {
    /// An accepted precheck.
    #[must_use]
    pub const fn accepted(
        estimated_cost: Option<Money>,
        margin_impact: Option<Money>,
        disclaimers: Option<DisclaimerBundle>,
    ) -> Self {
        Self {
            success: true,
            error: None,
            estimated_cost,
            margin_impact,
            disclaimers,
            request_id: None,
        }
    }

    /// A rejected precheck.
    #[must_use]
    pub const fn rejected(error: BusinessError) -> Self {
        Self {
            success: false,
            error: Some(error),
            estimated_cost: None,
            margin_impact: None,
            disclaimers: None,
            request_id: None,
        }
    }

    /// Attach the request id of the producing attempt.
    #[must_use]
    pub fn with_request_id(mut self, request_id: Option<RequestId>) -> Self {
        self.request_id = request_id;
        self
    }

    /// Disclaimer tokens requiring resolution (empty when none).
    #[must_use]
    pub fn disclaimer_tokens(&self) -> &[String] {
        self.disclaimers
            .as_ref()
            .map_or(&[], |bundle| bundle.tokens.as_slice())
    }

    /// Reason string for a rejected precheck.
    #[must_use]
    pub fn rejection_reason(&self) -> String {
        self.error
            .as_ref()
            .map_or_else(|| "precheck failed".to_string(), ToString::to_string)
    }
}
