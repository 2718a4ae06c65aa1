//! HTTP compute registry
//!
//! Talks to a remote function control plane:
//! - `GET  {base}/units/{name}`         -> `ComputeUnit`
//! - `PUT  {base}/units/{name}/code`    -> `Ack` (body: `ArtifactRef`)
//! - `POST {base}/units/{name}/invoke`  -> `InvocationResult` (body: payload)

use async_trait::async_trait;
use relay_core::domain::artifact::ArtifactRef;
use relay_core::domain::unit::{Ack, ComputeUnit, InvocationResult};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::debug;

use super::{ComputeRegistry, RegistryError};

#[derive(Debug, Clone)]
pub struct HttpComputeRegistry {
    base_url: String,
    client: Client,
}

impl HttpComputeRegistry {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Creates a registry client with a configured reqwest client (timeouts, TLS, ...)
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn unit_url(&self, name: &str, suffix: &str) -> String {
        format!("{}/units/{}{}", self.base_url, name, suffix)
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        name: &str,
        response: reqwest::Response,
    ) -> Result<T, RegistryError> {
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(name.to_string()));
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RegistryError::Rejected(format!(
                "status {}: {}",
                status.as_u16(),
                error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| RegistryError::Transport(format!("Failed to parse response: {}", e)))
    }
}

fn transport(err: reqwest::Error) -> RegistryError {
    RegistryError::Transport(err.to_string())
}

#[async_trait]
impl ComputeRegistry for HttpComputeRegistry {
    async fn get_unit(&self, name: &str) -> Result<ComputeUnit, RegistryError> {
        let response = self
            .client
            .get(self.unit_url(name, ""))
            .send()
            .await
            .map_err(transport)?;

        self.handle_response(name, response).await
    }

    async fn update_unit_code(
        &self,
        name: &str,
        artifact: &ArtifactRef,
    ) -> Result<Ack, RegistryError> {
        debug!("Requesting code update of {} to {}", name, artifact);

        let response = self
            .client
            .put(self.unit_url(name, "/code"))
            .json(artifact)
            .send()
            .await
            .map_err(transport)?;

        self.handle_response(name, response).await
    }

    async fn invoke_unit(
        &self,
        name: &str,
        payload: JsonValue,
    ) -> Result<InvocationResult, RegistryError> {
        let response = self
            .client
            .post(self.unit_url(name, "/invoke"))
            .json(&payload)
            .send()
            .await
            .map_err(transport)?;

        self.handle_response(name, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let registry = HttpComputeRegistry::new("http://control:9000/");
        assert_eq!(registry.base_url(), "http://control:9000");
        assert_eq!(
            registry.unit_url("MigrationLambda", "/invoke"),
            "http://control:9000/units/MigrationLambda/invoke"
        );
    }

    #[tokio::test]
    async fn test_unreachable_registry_is_transport_error() {
        // Port 9 (discard) is not expected to serve HTTP
        let registry = HttpComputeRegistry::new("http://127.0.0.1:9");
        let err = registry.get_unit("DeployedLambda").await.unwrap_err();
        assert!(matches!(err, RegistryError::Transport(_)));
    }
}
