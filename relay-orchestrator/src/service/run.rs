//! Run Service
//!
//! Accepts release triggers and serves the run history.

use relay_core::domain::run::PipelineRun;
use relay_core::domain::source::Trigger;
use relay_core::dto::run::{RunSummary, StageLogs, TriggerAccepted};
use relay_engine::TrainError;
use relay_engine::repository::RepositoryError;
use uuid::Uuid;

use crate::state::AppState;

/// Service error type
#[derive(Debug)]
pub enum RunError {
    NotFound(Uuid),
    ValidationError(String),
    RepositoryError(RepositoryError),
    TrainStopped,
}

impl From<RepositoryError> for RunError {
    fn from(err: RepositoryError) -> Self {
        RunError::RepositoryError(err)
    }
}

impl From<TrainError> for RunError {
    fn from(err: TrainError) -> Self {
        match err {
            TrainError::Repository(err) => RunError::RepositoryError(err),
            TrainError::Stopped => RunError::TrainStopped,
        }
    }
}

/// Queue a release of `trigger`
pub async fn trigger_release(state: &AppState, trigger: Trigger) -> Result<TriggerAccepted, RunError> {
    validate_trigger(state, &trigger)?;

    let accepted = state.train.submit(trigger).await?;

    tracing::info!(
        "Run {} queued with {} run(s) ahead",
        accepted.run_id,
        accepted.runs_ahead
    );

    Ok(accepted)
}

fn validate_trigger(state: &AppState, trigger: &Trigger) -> Result<(), RunError> {
    for (field, value) in [
        ("owner", &trigger.owner),
        ("repo", &trigger.repo),
        ("branch", &trigger.branch),
        ("commit_ref", &trigger.commit_ref),
    ] {
        if value.trim().is_empty() {
            return Err(RunError::ValidationError(format!("{} cannot be empty", field)));
        }
    }

    for (field, value) in [("branch", &trigger.branch), ("commit_ref", &trigger.commit_ref)] {
        if value.starts_with('-') {
            return Err(RunError::ValidationError(format!(
                "{} cannot start with '-'",
                field
            )));
        }
    }

    if !state.source.matches(&trigger.owner, &trigger.repo) {
        return Err(RunError::ValidationError(format!(
            "{}/{} is not the configured repository",
            trigger.owner, trigger.repo
        )));
    }

    Ok(())
}

/// Get a run by ID
pub async fn get_run(state: &AppState, id: Uuid) -> Result<PipelineRun, RunError> {
    state
        .runs
        .find_by_id(id)
        .await?
        .ok_or(RunError::NotFound(id))
}

/// List all runs, newest first
pub async fn list_runs(state: &AppState) -> Result<Vec<RunSummary>, RunError> {
    let runs = state.runs.list().await?;
    Ok(runs.into_iter().map(RunSummary::from).collect())
}

/// Get the per-stage logs of a run
pub async fn get_run_logs(state: &AppState, id: Uuid) -> Result<Vec<StageLogs>, RunError> {
    let run = get_run(state, id).await?;
    Ok(StageLogs::for_run(&run))
}
