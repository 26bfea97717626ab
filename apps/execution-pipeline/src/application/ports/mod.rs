//! Application Ports (Driven)
//!
//! Ports define interfaces for interacting with external systems:
//! the venue REST API, the credential source, and the submission store.

mod credential_port;
mod submission_port;
mod venue_port;

#[cfg(test)]
pub(crate) mod mock;

pub use credential_port::{CredentialError, CredentialProvider};
pub use submission_port::{
    IntentionFingerprint, SubmissionClaim, SubmissionRecord, SubmissionRepository,
    SubmissionStoreError,
};
pub use venue_port::{
    PlacementReply, RateLimitSnapshot, RateLimitValue, VenueError, VenuePort,
};
