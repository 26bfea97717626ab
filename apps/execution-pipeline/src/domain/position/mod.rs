//! Position Bounded Context
//!
//! Net holdings per instrument and the guards that keep the pipeline from
//! stacking duplicate buys, extending shorts, or overselling.

pub mod guard;
pub mod holding;

pub use guard::{
    DuplicateBuyPolicy, GuardDecision, GuardPolicy, GuardReason, evaluate_buy, evaluate_sell,
};
pub use holding::{Position, PositionMap, index_positions};
