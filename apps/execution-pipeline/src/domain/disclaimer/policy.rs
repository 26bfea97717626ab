//! Disclaimer acceptance policy and the pure decision it drives.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::disclaimer::DisclaimerRecord;

/// How normal (non-blocking) disclaimers are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisclaimerPolicy {
    /// Any disclaimer blocks trading.
    #[default]
    BlockAll,
    /// Accept eligible normal disclaimers automatically.
    AutoAcceptNormal,
    /// Normal disclaimers wait for an operator.
    ManualReview,
}

impl DisclaimerPolicy {
    /// Stable label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BlockAll => "block_all",
            Self::AutoAcceptNormal => "auto_accept_normal",
            Self::ManualReview => "manual_review",
        }
    }
}

impl fmt::Display for DisclaimerPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the resolver should do for a set of records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionPlan {
    /// No disclaimers to act on.
    Allow,
    /// Trading is blocked; nothing is accepted.
    Block {
        /// Why.
        reason: String,
    },
    /// Accept these tokens; trading is allowed only if every acceptance succeeds.
    Accept {
        /// Tokens to accept, in order.
        tokens: Vec<String>,
    },
}

/// Decide the resolution for fetched records.
///
/// Any blocking record blocks regardless of policy. Under
/// `AutoAcceptNormal` every normal record must be auto-acceptable, or
/// nothing is accepted.
#[must_use]
pub fn plan_resolution(records: &[DisclaimerRecord], policy: DisclaimerPolicy) -> ResolutionPlan {
    if records.is_empty() {
        return ResolutionPlan::Allow;
    }

    let blocking: Vec<&str> = records
        .iter()
        .filter(|r| r.is_blocking)
        .map(|r| r.token.as_str())
        .collect();
    if !blocking.is_empty() {
        return ResolutionPlan::Block {
            reason: format!("blocking disclaimers present: {}", blocking.join(", ")),
        };
    }

    match policy {
        DisclaimerPolicy::BlockAll => ResolutionPlan::Block {
            reason: format!("{} disclaimer(s) present under block_all policy", records.len()),
        },
        DisclaimerPolicy::ManualReview => ResolutionPlan::Block {
            reason: format!("{} disclaimer(s) pending manual review", records.len()),
        },
        DisclaimerPolicy::AutoAcceptNormal => {
            let ineligible: Vec<&str> = records
                .iter()
                .filter(|r| !r.can_auto_accept())
                .map(|r| r.token.as_str())
                .collect();
            if ineligible.is_empty() {
                ResolutionPlan::Accept {
                    tokens: records.iter().map(|r| r.token.clone()).collect(),
                }
            } else {
                ResolutionPlan::Block {
                    reason: format!(
                        "disclaimers require user input or lack an Accepted response: {}",
                        ineligible.join(", ")
                    ),
                }
            }
        }
    }
}
