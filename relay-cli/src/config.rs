//! CLI configuration

use relay_client::OrchestratorClient;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the orchestrator service
    pub orchestrator_url: String,
}

impl Config {
    pub fn new(orchestrator_url: impl Into<String>) -> Self {
        Self {
            orchestrator_url: orchestrator_url.into(),
        }
    }

    /// Client bound to the configured orchestrator
    pub fn client(&self) -> OrchestratorClient {
        OrchestratorClient::new(&self.orchestrator_url)
    }
}
