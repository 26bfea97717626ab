//! Instrument Bounded Context
//!
//! Trading constraints the venue reports per instrument, and the pure
//! checks that decide whether an intention satisfies them.

pub mod constraints;
pub mod market_state;

pub use constraints::{InstrumentConstraints, OrderTypeSetting, ValidationRejection, is_aligned};
pub use market_state::MarketState;
