//! Data Transfer Objects (DTOs)
//!
//! DTOs are used for API boundaries and use case inputs/outputs.

mod execution_result;
mod intention_dto;

pub use execution_result::ExecutionResult;
pub use intention_dto::OrderIntentionDto;
