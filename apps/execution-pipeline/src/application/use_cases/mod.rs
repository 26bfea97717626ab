//! Application Use Cases
//!
//! Use cases orchestrate domain logic to fulfill application requirements.

mod execute_order;
mod map_signal;

pub use execute_order::{
    ExecutionOrchestrator, OrchestratorSettings, PipelineError, PipelineStages, SessionContext,
};
pub use map_signal::IntentionMapper;
