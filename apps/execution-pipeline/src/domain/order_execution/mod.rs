//! Order Execution Bounded Context
//!
//! The order intention and everything the pipeline learns about it on the
//! way to the book: precheck results, placement and reconciliation
//! outcomes, and the ledger rows used to resolve ambiguity.

pub mod correlation;
pub mod intention;
pub mod ledger;
pub mod outcome;
pub mod precheck;
pub mod value_objects;

pub use correlation::{ExternalReference, generate_external_reference};
pub use intention::OrderIntention;
pub use ledger::LedgerOrder;
pub use outcome::{
    FinalExecutionStatus, PlacementOutcome, ReconciliationOutcome, derive_final_status,
    resolve_reconciliation,
};
pub use precheck::{BusinessError, PrecheckOutcome};
pub use value_objects::{DurationType, ExecutionStatus, OrderSide, OrderType};
