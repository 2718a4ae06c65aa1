//! Run API Handlers
//!
//! HTTP endpoints for triggering releases and reading run history.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use relay_core::domain::run::PipelineRun;
use relay_core::domain::source::Trigger;
use relay_core::dto::run::{RunSummary, StageLogs, TriggerAccepted};
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::service::run_service;
use crate::state::AppState;

/// POST /pipeline/trigger
/// Queue a release of the given commit
pub async fn trigger_release(
    State(state): State<AppState>,
    Json(trigger): Json<Trigger>,
) -> ApiResult<(StatusCode, Json<TriggerAccepted>)> {
    tracing::info!("Release requested for {}", trigger);

    let accepted = run_service::trigger_release(&state, trigger).await?;

    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

/// GET /run/list
pub async fn list_runs(State(state): State<AppState>) -> ApiResult<Json<Vec<RunSummary>>> {
    tracing::debug!("Listing runs");

    let runs = run_service::list_runs(&state).await?;

    Ok(Json(runs))
}

/// GET /run/{id}
pub async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PipelineRun>> {
    tracing::debug!("Getting run: {}", id);

    let run = run_service::get_run(&state, id).await?;

    Ok(Json(run))
}

/// GET /run/{id}/logs
pub async fn get_run_logs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<StageLogs>>> {
    let logs = run_service::get_run_logs(&state, id).await?;

    Ok(Json(logs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ApiError;
    use crate::state::testing;

    #[tokio::test]
    async fn test_trigger_is_accepted() {
        let state = testing::state();

        let (status, Json(accepted)) = trigger_release(
            State(state.clone()),
            Json(Trigger::new("acme", "shop", "main", "abc123")),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::ACCEPTED);
        let Json(run) = get_run(State(state), Path(accepted.run_id)).await.unwrap();
        assert_eq!(run.trigger.commit_ref, "abc123");
    }

    #[tokio::test]
    async fn test_unknown_run_is_404() {
        let state = testing::state();
        let result = get_run(State(state), Path(Uuid::new_v4())).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }
}
