//! Strongly-typed identifiers for venue entities.
//!
//! These prevent mixing up account, client, and order keys that are all
//! plain strings on the wire.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from a string.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

define_id!(AccountKey, "Venue account key an order is booked against.");
define_id!(ClientKey, "Venue client key owning one or more accounts.");
define_id!(OrderId, "Venue-assigned order identifier.");
define_id!(
    RequestId,
    "Per-attempt idempotency token sent as the `x-request-id` header."
);

impl RequestId {
    /// Generate a fresh request id using UUID v4.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl OrderId {
    /// Sentinel id returned for dry-run placements.
    pub const DRY_RUN: &'static str = "DRY_RUN";

    /// Sentinel order id for a dry run.
    #[must_use]
    pub fn dry_run() -> Self {
        Self(Self::DRY_RUN.to_string())
    }

    /// Whether this is the dry-run sentinel.
    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.0 == Self::DRY_RUN
    }
}
