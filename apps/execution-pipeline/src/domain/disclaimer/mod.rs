//! Disclaimer Bounded Context
//!
//! Legal acknowledgments the venue requires before trading, and the policy
//! deciding which of them the pipeline may accept on its own.

pub mod policy;
pub mod record;

pub use policy::{DisclaimerPolicy, ResolutionPlan, plan_resolution};
pub use record::{ACCEPTED_RESPONSE, DisclaimerBundle, DisclaimerRecord};
