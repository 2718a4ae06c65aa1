//! Grant endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use relay_core::domain::grant::Grant;

impl OrchestratorClient {
    /// List provisioned grants
    ///
    /// # Arguments
    /// * `principal` - Optional principal filter, e.g. `code-deployer:migration`
    pub async fn list_grants(&self, principal: Option<&str>) -> Result<Vec<Grant>> {
        let mut request = self.client.get(self.url("/grants"));
        if let Some(principal) = principal {
            request = request.query(&[("principal", principal)]);
        }

        let response = request.send().await?;

        self.handle_response(response).await
    }
}
