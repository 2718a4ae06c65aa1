//! Secret providers
//!
//! Credentials (e.g. the source-control token) are resolved by id at the
//! moment a stage needs them and never stored on run records.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret '{0}' not found")]
    NotFound(String),
}

/// Resolves secrets by id
#[async_trait]
pub trait SecretProvider: Send + Sync {
    async fn secret(&self, id: &str) -> Result<String, SecretError>;
}

/// Reads secrets from environment variables
///
/// The id `github-pat` is read from `GITHUB_PAT`.
#[derive(Debug, Default, Clone)]
pub struct EnvSecretProvider;

impl EnvSecretProvider {
    pub fn variable_name(id: &str) -> String {
        id.to_ascii_uppercase().replace(['-', '.', '/'], "_")
    }
}

#[async_trait]
impl SecretProvider for EnvSecretProvider {
    async fn secret(&self, id: &str) -> Result<String, SecretError> {
        std::env::var(Self::variable_name(id))
            .ok()
            .filter(|value| !value.is_empty())
            .ok_or_else(|| SecretError::NotFound(id.to_string()))
    }
}

/// Fixed set of secrets
#[derive(Debug, Default, Clone)]
pub struct StaticSecretProvider {
    secrets: HashMap<String, String>,
}

impl StaticSecretProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, id: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(id.into(), value.into());
        self
    }
}

#[async_trait]
impl SecretProvider for StaticSecretProvider {
    async fn secret(&self, id: &str) -> Result<String, SecretError> {
        self.secrets
            .get(id)
            .cloned()
            .ok_or_else(|| SecretError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_name() {
        assert_eq!(EnvSecretProvider::variable_name("github-pat"), "GITHUB_PAT");
        assert_eq!(EnvSecretProvider::variable_name("db/secret.arn"), "DB_SECRET_ARN");
    }

    #[tokio::test]
    async fn test_static_provider() {
        let provider = StaticSecretProvider::new().with_secret("github-pat", "token");
        assert_eq!(provider.secret("github-pat").await.unwrap(), "token");
        assert!(provider.secret("other").await.is_err());
    }
}
