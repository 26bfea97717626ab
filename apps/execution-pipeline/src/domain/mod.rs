//! Domain Layer
//!
//! The innermost layer containing business logic with zero infrastructure dependencies.
//!
//! # Bounded Contexts
//!
//! - [`order_execution`]: Order intention, precheck, placement and reconciliation outcomes
//! - [`instrument`]: Per-instrument trading constraints and validation
//! - [`position`]: Net positions and buy/sell guards
//! - [`disclaimer`]: Pre-trade disclaimers and acceptance policy

pub mod disclaimer;
pub mod instrument;
pub mod order_execution;
pub mod position;
pub mod shared;
pub mod signal;
