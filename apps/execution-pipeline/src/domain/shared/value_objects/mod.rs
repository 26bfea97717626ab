//! Shared Value Objects
//!
//! Immutable domain types used across bounded contexts.
//! Value objects are compared by value, not identity.

mod identifiers;
mod instrument;
mod money;
mod quantity;

pub use identifiers::{AccountKey, ClientKey, OrderId, RequestId};
pub use instrument::{AssetType, InstrumentKey};
pub use money::Money;
pub use quantity::Quantity;
