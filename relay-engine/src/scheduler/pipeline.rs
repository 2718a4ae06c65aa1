//! Pipeline scheduler
//!
//! Owns the stage sequencing for a single run:
//! - The run enters the single release lane (at most one run is active)
//! - Stages start only after their predecessor succeeded
//! - The first failure ends the run; later stages stay pending
//! - The run record is persisted after every transition

use relay_core::domain::artifact::Artifact;
use relay_core::domain::run::{
    PipelineRun, StageId, StageOutput, StageStatus, Transition, next,
};
use relay_core::domain::source::Trigger;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::build::BuildProcedure;
use crate::config::PipelineSettings;
use crate::context::StageLog;
use crate::error::StageError;
use crate::permissions::PermissionModel;
use crate::registry::ComputeRegistry;
use crate::repository::{RepositoryError, RunRepository};
use crate::source::SourceFetcher;
use crate::stage::{BuildStage, CodeUpdateStage, FetchStage, MigrationStage};
use crate::store::ArtifactStore;

/// Collaborators a scheduler is built from
#[derive(Clone)]
pub struct SchedulerDeps {
    pub fetcher: Arc<dyn SourceFetcher>,
    pub build: Arc<dyn BuildProcedure>,
    pub store: Arc<dyn ArtifactStore>,
    pub registry: Arc<dyn ComputeRegistry>,
    pub permissions: Arc<PermissionModel>,
    pub runs: Arc<dyn RunRepository>,
}

pub struct PipelineScheduler {
    fetcher: Arc<dyn SourceFetcher>,
    fetch: FetchStage,
    build: BuildStage,
    update: CodeUpdateStage,
    migrate: MigrationStage,
    runs: Arc<dyn RunRepository>,
    settings: PipelineSettings,
    /// The release lane; tokio's mutex hands it out in request order
    lane: Mutex<()>,
}

impl PipelineScheduler {
    pub fn new(deps: SchedulerDeps, settings: PipelineSettings) -> Self {
        Self {
            fetch: FetchStage::new(deps.fetcher.clone(), deps.permissions.clone()),
            build: BuildStage::new(
                deps.build,
                deps.store,
                deps.permissions.clone(),
                settings.artifact_name.clone(),
            ),
            update: CodeUpdateStage::new(deps.registry.clone(), deps.permissions.clone()),
            migrate: MigrationStage::new(
                deps.registry,
                deps.permissions,
                settings.migration_timeout,
            ),
            fetcher: deps.fetcher,
            runs: deps.runs,
            settings,
            lane: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn runs(&self) -> &Arc<dyn RunRepository> {
        &self.runs
    }

    /// Records a queued run for `trigger` and executes it to completion
    pub async fn run(&self, trigger: Trigger) -> Result<PipelineRun, RepositoryError> {
        let run = PipelineRun::new(trigger);
        self.runs.insert(&run).await?;
        Ok(self.execute(run).await)
    }

    /// Drives `run` through the release sequence and returns the final record
    ///
    /// Waits for the release lane first, so concurrent callers execute one
    /// after the other in the order they called.
    pub async fn execute(&self, mut run: PipelineRun) -> PipelineRun {
        if run.is_terminal() {
            debug!("Run {} already finished as {}", run.id, run.status);
            return run;
        }

        let _lane = self.lane.lock().await;

        info!("Starting run {} for {}", run.id, run.trigger);
        run.start();
        self.save(&run).await;

        let mut current: Option<StageId> = None;
        let mut last = StageStatus::Pending;

        loop {
            match next(current, last) {
                Transition::Start(stage) => {
                    run.begin_stage(stage);
                    self.save(&run).await;

                    let log = StageLog::new();
                    last = match self.execute_stage(stage, &run, &log).await {
                        Ok(output) => {
                            debug!("Run {}: {} succeeded", run.id, stage);
                            run.complete_stage(stage, output, log.drain());
                            StageStatus::Succeeded
                        }
                        Err(e) => {
                            error!("Run {}: {} failed: {}", run.id, stage, e);
                            log.log_error(e.to_string());
                            run.fail_stage(e.into_failure(stage), log.drain());
                            StageStatus::Failed
                        }
                    };
                    current = Some(stage);
                    self.save(&run).await;
                }
                Transition::Finish(status) => {
                    run.finish(status);
                    self.save(&run).await;
                    break;
                }
                Transition::Blocked => {
                    warn!("Run {} stalled on a non-terminal stage", run.id);
                    run.interrupt("stage did not reach a terminal status");
                    self.save(&run).await;
                    break;
                }
            }
        }

        if let Some(snapshot) = &run.snapshot {
            self.fetcher.release(snapshot).await;
        }

        match &run.failure {
            None => info!(
                "Run {} succeeded; live version {}",
                run.id,
                run.live_version
                    .as_ref()
                    .map_or("-", |v| v.as_str())
            ),
            Some(failure) => warn!("Run {} failed: {}", run.id, failure),
        }

        run
    }

    async fn execute_stage(
        &self,
        stage: StageId,
        run: &PipelineRun,
        log: &StageLog,
    ) -> Result<StageOutput, StageError> {
        match stage {
            StageId::Fetch => self
                .fetch
                .run(&run.trigger, log)
                .await
                .map(StageOutput::Snapshot),
            StageId::Build => {
                let snapshot = run
                    .snapshot
                    .as_ref()
                    .ok_or_else(|| StageError::NotFound("source snapshot".to_string()))?;
                self.build.run(snapshot, log).await.map(StageOutput::Artifact)
            }
            StageId::UpdateCode(role) => {
                let artifact = require_artifact(run)?;
                let unit = self.settings.targets.name_for(role);
                let ack = self.update.update_code(role, unit, artifact, log).await?;
                Ok(StageOutput::CodeUpdated {
                    unit: unit.to_string(),
                    version: artifact.version.clone(),
                    ack,
                })
            }
            StageId::InvokeMigration => {
                let artifact = require_artifact(run)?;
                let payload = json!({
                    "run_id": run.id,
                    "artifact_version": artifact.version,
                    "commit_ref": artifact.source_commit,
                });
                self.migrate
                    .invoke(&self.settings.targets.migration, payload, log)
                    .await
                    .map(StageOutput::Invocation)
            }
        }
    }

    /// Persists the run; storage failures never abort a release in flight
    async fn save(&self, run: &PipelineRun) {
        if let Err(e) = self.runs.update(run).await {
            error!("Failed to persist run {}: {}", run.id, e);
        }
    }
}

fn require_artifact(run: &PipelineRun) -> Result<&Artifact, StageError> {
    run.artifact
        .as_ref()
        .ok_or_else(|| StageError::NotFound("build artifact".to_string()))
}
