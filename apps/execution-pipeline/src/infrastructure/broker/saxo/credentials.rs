//! Bearer token providers.

use async_trait::async_trait;

use crate::application::ports::{CredentialError, CredentialProvider};

/// A fixed token, typically a 24h developer token.
#[derive(Clone)]
pub struct StaticCredentials {
    token: String,
}

impl StaticCredentials {
    /// Wrap a token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn bearer_token(&self) -> Result<String, CredentialError> {
        if self.token.trim().is_empty() {
            return Err(CredentialError::Missing("empty static token".to_string()));
        }
        Ok(self.token.clone())
    }
}

/// Reads the token from an environment variable on every request, so an
/// external refresher can rotate it in place.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    var: String,
}

impl EnvCredentials {
    /// Read from `var`.
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    /// Variable name.
    #[must_use]
    pub fn var(&self) -> &str {
        &self.var
    }
}

#[async_trait]
impl CredentialProvider for EnvCredentials {
    async fn bearer_token(&self) -> Result<String, CredentialError> {
        match std::env::var(&self.var) {
            Ok(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            Ok(_) => Err(CredentialError::Missing(format!("{} is empty", self.var))),
            Err(_) => Err(CredentialError::Missing(format!("{} is not set", self.var))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token() {
        let provider = StaticCredentials::new("abc");
        assert_eq!(provider.bearer_token().await.unwrap(), "abc");
        assert!(!format!("{provider:?}").contains("abc"));
    }

    #[tokio::test]
    async fn test_empty_static_token_is_missing() {
        let err = StaticCredentials::new("  ").bearer_token().await.unwrap_err();
        assert!(matches!(err, CredentialError::Missing(_)));
    }

    #[tokio::test]
    async fn test_unset_env_var_is_missing() {
        let provider = EnvCredentials::new("EXECUTION_PIPELINE_TEST_TOKEN_THAT_IS_NEVER_SET");
        let err = provider.bearer_token().await.unwrap_err();
        assert!(err.to_string().contains("is not set"));
    }
}
