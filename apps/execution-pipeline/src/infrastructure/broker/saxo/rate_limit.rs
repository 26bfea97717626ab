//! Rate-limit header parsing, per-category tracking, and request spacing.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::application::ports::{RateLimitSnapshot, RateLimitValue};
use crate::observability::update_rate_limit_remaining;

const HEADER_PREFIX: &str = "x-ratelimit-";

/// Logical endpoint group. Limits and throttling are tracked per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointCategory {
    /// Instrument reference data.
    RefData,
    /// Positions and the order ledger.
    Portfolio,
    /// Order precheck.
    Precheck,
    /// Order placement.
    Orders,
    /// Disclaimer management.
    Disclaimers,
}

impl EndpointCategory {
    /// Metric label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RefData => "ref_data",
            Self::Portfolio => "portfolio",
            Self::Precheck => "precheck",
            Self::Orders => "orders",
            Self::Disclaimers => "disclaimers",
        }
    }

    /// Every category.
    pub const ALL: [Self; 5] = [
        Self::RefData,
        Self::Portfolio,
        Self::Precheck,
        Self::Orders,
        Self::Disclaimers,
    ];
}

impl fmt::Display for EndpointCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse every `X-RateLimit-<Dimension>-<Field>` header.
///
/// Dimension and field are lower-cased; a value that is not an integer is
/// kept verbatim. Headers with no field part are recorded only in
/// `raw_headers`.
pub fn parse_rate_limit_headers<'a>(
    headers: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> RateLimitSnapshot {
    let mut snapshot = RateLimitSnapshot::default();

    for (name, value) in headers {
        let lowered = name.to_ascii_lowercase();
        let Some(rest) = lowered.strip_prefix(HEADER_PREFIX) else {
            continue;
        };
        snapshot
            .raw_headers
            .insert(name.to_string(), value.to_string());

        let Some((dimension, field)) = rest.split_once('-') else {
            continue;
        };
        if dimension.is_empty() || field.is_empty() {
            continue;
        }

        let parsed = value.trim().parse::<i64>().map_or_else(
            |_| RateLimitValue::Raw(value.to_string()),
            RateLimitValue::Integer,
        );
        snapshot
            .dimensions
            .entry(dimension.to_string())
            .or_insert_with(BTreeMap::new)
            .insert(field.to_string(), parsed);
    }

    snapshot
}

/// [`parse_rate_limit_headers`] over a response header map.
pub fn parse_header_map(headers: &HeaderMap) -> RateLimitSnapshot {
    parse_rate_limit_headers(
        headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v))),
    )
}

/// Latest rate-limit state per endpoint category plus the min-interval
/// throttle.
///
/// Process-scoped: nothing here survives a restart, backoff relearns the
/// limits from fresh headers.
#[derive(Debug)]
pub struct RateLimitTracker {
    latest: RwLock<HashMap<EndpointCategory, RateLimitSnapshot>>,
    min_intervals: HashMap<EndpointCategory, Duration>,
    last_request: HashMap<EndpointCategory, Mutex<Option<Instant>>>,
}

impl RateLimitTracker {
    /// Create a tracker. Categories without an interval are not throttled.
    #[must_use]
    pub fn new(min_intervals: HashMap<EndpointCategory, Duration>) -> Self {
        let last_request = EndpointCategory::ALL
            .into_iter()
            .map(|category| (category, Mutex::new(None)))
            .collect();
        Self {
            latest: RwLock::new(HashMap::new()),
            min_intervals,
            last_request,
        }
    }

    /// Wait until `last request + min interval` for the category, then
    /// claim the slot.
    ///
    /// The slot lock is held across the sleep so concurrent callers of one
    /// category are spaced out instead of released together.
    pub async fn throttle(&self, category: EndpointCategory) {
        let Some(interval) = self
            .min_intervals
            .get(&category)
            .copied()
            .filter(|i| !i.is_zero())
        else {
            return;
        };
        let Some(slot) = self.last_request.get(&category) else {
            return;
        };

        let mut last = slot.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + interval;
            if ready_at > Instant::now() {
                tracing::debug!(
                    category = %category,
                    wait_ms = ready_at.saturating_duration_since(Instant::now()).as_millis(),
                    "Throttling request"
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Store the snapshot of a response and publish remaining-quota gauges.
    pub fn record(&self, category: EndpointCategory, snapshot: &RateLimitSnapshot) {
        if snapshot.is_empty() {
            return;
        }

        for (dimension, fields) in &snapshot.dimensions {
            if let Some(remaining) = fields.get("remaining").and_then(RateLimitValue::as_i64) {
                update_rate_limit_remaining(category.as_str(), dimension, remaining);
                if remaining <= 1 {
                    tracing::warn!(
                        category = %category,
                        dimension = %dimension,
                        remaining,
                        "Rate limit nearly exhausted"
                    );
                }
            }
        }

        self.latest
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(category, snapshot.clone());
    }

    /// Last snapshot seen for a category.
    #[must_use]
    pub fn latest(&self, category: EndpointCategory) -> Option<RateLimitSnapshot> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&category)
            .cloned()
    }
}

impl Default for RateLimitTracker {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}
