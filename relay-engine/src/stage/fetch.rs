//! Fetch stage

use relay_core::domain::grant::{Action, Principal, Resource};
use relay_core::domain::source::{SourceSnapshot, Trigger};
use std::sync::Arc;
use tracing::info;

use crate::context::StageLog;
use crate::error::StageError;
use crate::permissions::PermissionModel;
use crate::source::SourceFetcher;

/// Resolves the trigger into a source snapshot
pub struct FetchStage {
    fetcher: Arc<dyn SourceFetcher>,
    permissions: Arc<PermissionModel>,
}

impl FetchStage {
    pub fn new(fetcher: Arc<dyn SourceFetcher>, permissions: Arc<PermissionModel>) -> Self {
        Self {
            fetcher,
            permissions,
        }
    }

    pub async fn run(&self, trigger: &Trigger, log: &StageLog) -> Result<SourceSnapshot, StageError> {
        self.permissions.authorize(
            Principal::PipelineRole,
            Resource::SourceCredentials,
            Action::SecretRead,
        )?;

        log.log_info(format!("Fetching {}", trigger));
        let snapshot = self.fetcher.fetch(trigger).await?;

        info!("Fetched {} at {}", trigger.source_url(), snapshot.commit_ref);
        log.log_info(format!("Checked out {}", snapshot.commit_ref));

        Ok(snapshot)
    }
}
