//! Release and run history endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use relay_core::domain::run::PipelineRun;
use relay_core::domain::source::Trigger;
use relay_core::dto::run::{RunSummary, StageLogs, TriggerAccepted};
use uuid::Uuid;

impl OrchestratorClient {
    /// Queue a release of `trigger`
    ///
    /// # Returns
    /// The queued run id and the number of runs ahead of it
    pub async fn trigger_release(&self, trigger: &Trigger) -> Result<TriggerAccepted> {
        let response = self
            .client
            .post(self.url("/pipeline/trigger"))
            .json(trigger)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// List all runs, newest first
    pub async fn list_runs(&self) -> Result<Vec<RunSummary>> {
        let response = self.client.get(self.url("/run/list")).send().await?;

        self.handle_response(response).await
    }

    /// Get a run with all stage records
    pub async fn get_run(&self, run_id: Uuid) -> Result<PipelineRun> {
        let response = self
            .client
            .get(self.url(&format!("/run/{}", run_id)))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get the per-stage logs of a run
    pub async fn get_run_logs(&self, run_id: Uuid) -> Result<Vec<StageLogs>> {
        let response = self
            .client
            .get(self.url(&format!("/run/{}/logs", run_id)))
            .send()
            .await?;

        self.handle_response(response).await
    }
}
