//! Release target endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use relay_core::domain::unit::ComputeUnit;

impl OrchestratorClient {
    /// Current state of the application, migration and cleanup units
    pub async fn list_units(&self) -> Result<Vec<ComputeUnit>> {
        let response = self.client.get(self.url("/unit/list")).send().await?;

        self.handle_response(response).await
    }
}
