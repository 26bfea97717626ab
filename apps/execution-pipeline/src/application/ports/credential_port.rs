//! Credential Port (Driven Port)
//!
//! Accessor for a currently valid bearer token. Token acquisition and
//! refresh live behind this trait.

use async_trait::async_trait;
use thiserror::Error;

/// Credential errors.
#[derive(Debug, Clone, Error)]
pub enum CredentialError {
    /// Nothing is configured.
    #[error("no credential configured: {0}")]
    Missing(String),
    /// The provider failed to produce a token.
    #[error("credential refresh failed: {0}")]
    Refresh(String),
}

/// Supplies bearer tokens, refreshing transparently.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// A token valid for the next request.
    async fn bearer_token(&self) -> Result<String, CredentialError>;
}
