//! Reconciliation scan configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bounds of the correlation scan over recent orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    /// Orders fetched per scan.
    pub scan_limit: usize,
    /// Orders older than this are ignored when the ledger reports a time.
    pub max_order_age_secs: u64,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            scan_limit: 100,
            max_order_age_secs: 86_400,
        }
    }
}

impl ReconciliationConfig {
    /// Maximum order age as a duration.
    #[must_use]
    pub const fn max_order_age(&self) -> Duration {
        Duration::from_secs(self.max_order_age_secs)
    }
}
