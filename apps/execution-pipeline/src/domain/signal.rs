//! Trading signals consumed from the strategy.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Action a strategy recommends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalAction {
    /// Open or add.
    Buy,
    /// Close.
    Sell,
    /// Do nothing.
    Hold,
}

/// One strategy decision for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Recommended action.
    pub action: SignalAction,
    /// Strategy's explanation.
    pub reason: String,
    /// Confidence in `[0, 1]`, when the strategy reports one.
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Price the decision was made at.
    #[serde(default)]
    pub price_ref: Option<Decimal>,
}
