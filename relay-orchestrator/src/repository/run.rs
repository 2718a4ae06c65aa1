//! Pipeline Run Repository
//!
//! Postgres-backed run history for the release train.

use async_trait::async_trait;
use relay_core::domain::artifact::ArtifactVersion;
use relay_core::domain::run::{PipelineRun, RunStatus};
use relay_core::domain::source::Trigger;
use relay_engine::repository::{RepositoryError, RunRepository};
use sqlx::PgPool;
use uuid::Uuid;

const SELECT_RUN: &str = r#"
    SELECT id, owner, repo, branch, commit_ref, status, stages, snapshot, artifact,
           live_version, failure, requested_at, started_at, completed_at
    FROM pipeline_runs
"#;

pub struct PgRunRepository {
    pool: PgPool,
}

impl PgRunRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn backend(err: sqlx::Error) -> RepositoryError {
    RepositoryError::Backend(err.to_string())
}

fn optional_json<T: serde::Serialize>(
    value: &Option<T>,
) -> Result<Option<serde_json::Value>, RepositoryError> {
    value
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(RepositoryError::from)
}

#[async_trait]
impl RunRepository for PgRunRepository {
    async fn insert(&self, run: &PipelineRun) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO pipeline_runs (id, owner, repo, branch, commit_ref, status, stages,
                                       snapshot, artifact, live_version, failure,
                                       requested_at, started_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(run.id)
        .bind(&run.trigger.owner)
        .bind(&run.trigger.repo)
        .bind(&run.trigger.branch)
        .bind(&run.trigger.commit_ref)
        .bind(run.status.to_string())
        .bind(serde_json::to_value(&run.stages)?)
        .bind(optional_json(&run.snapshot)?)
        .bind(optional_json(&run.artifact)?)
        .bind(run.live_version.as_ref().map(|v| v.as_str().to_string()))
        .bind(optional_json(&run.failure)?)
        .bind(run.requested_at)
        .bind(run.started_at)
        .bind(run.completed_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    async fn update(&self, run: &PipelineRun) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE pipeline_runs
            SET status = $1, stages = $2, snapshot = $3, artifact = $4, live_version = $5,
                failure = $6, started_at = $7, completed_at = $8
            WHERE id = $9
            "#,
        )
        .bind(run.status.to_string())
        .bind(serde_json::to_value(&run.stages)?)
        .bind(optional_json(&run.snapshot)?)
        .bind(optional_json(&run.artifact)?)
        .bind(run.live_version.as_ref().map(|v| v.as_str().to_string()))
        .bind(optional_json(&run.failure)?)
        .bind(run.started_at)
        .bind(run.completed_at)
        .bind(run.id)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(run.id));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PipelineRun>, RepositoryError> {
        let row = sqlx::query_as::<_, RunRow>(&format!("{} WHERE id = $1", SELECT_RUN))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.map(PipelineRun::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<PipelineRun>, RepositoryError> {
        let rows = sqlx::query_as::<_, RunRow>(&format!("{} ORDER BY requested_at DESC", SELECT_RUN))
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        rows.into_iter().map(PipelineRun::try_from).collect()
    }

    async fn find_by_status(&self, status: RunStatus) -> Result<Vec<PipelineRun>, RepositoryError> {
        let rows = sqlx::query_as::<_, RunRow>(&format!(
            "{} WHERE status = $1 ORDER BY requested_at ASC",
            SELECT_RUN
        ))
        .bind(status.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(PipelineRun::try_from).collect()
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct RunRow {
    id: Uuid,
    owner: String,
    repo: String,
    branch: String,
    commit_ref: String,
    status: String,
    stages: serde_json::Value,
    snapshot: Option<serde_json::Value>,
    artifact: Option<serde_json::Value>,
    live_version: Option<String>,
    failure: Option<serde_json::Value>,
    requested_at: chrono::DateTime<chrono::Utc>,
    started_at: Option<chrono::DateTime<chrono::Utc>>,
    completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl TryFrom<RunRow> for PipelineRun {
    type Error = RepositoryError;

    fn try_from(row: RunRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<RunStatus>()
            .map_err(RepositoryError::Backend)?;

        Ok(PipelineRun {
            id: row.id,
            trigger: Trigger::new(row.owner, row.repo, row.branch, row.commit_ref),
            status,
            stages: serde_json::from_value(row.stages)?,
            snapshot: row.snapshot.map(serde_json::from_value).transpose()?,
            artifact: row.artifact.map(serde_json::from_value).transpose()?,
            live_version: row.live_version.map(ArtifactVersion::new),
            failure: row.failure.map(serde_json::from_value).transpose()?,
            requested_at: row.requested_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::domain::run::{FailureKind, StageFailure, StageId};

    fn row_from(run: &PipelineRun) -> RunRow {
        RunRow {
            id: run.id,
            owner: run.trigger.owner.clone(),
            repo: run.trigger.repo.clone(),
            branch: run.trigger.branch.clone(),
            commit_ref: run.trigger.commit_ref.clone(),
            status: run.status.to_string(),
            stages: serde_json::to_value(&run.stages).unwrap(),
            snapshot: optional_json(&run.snapshot).unwrap(),
            artifact: optional_json(&run.artifact).unwrap(),
            live_version: run.live_version.as_ref().map(|v| v.to_string()),
            failure: optional_json(&run.failure).unwrap(),
            requested_at: run.requested_at,
            started_at: run.started_at,
            completed_at: run.completed_at,
        }
    }

    #[test]
    fn test_row_restores_failed_run() {
        let mut run = PipelineRun::new(Trigger::new("acme", "shop", "main", "abc123"));
        run.start();
        run.begin_stage(StageId::Fetch);
        run.fail_stage(
            StageFailure {
                stage: StageId::Fetch,
                kind: FailureKind::SourceUnavailable,
                message: "branch deleted".to_string(),
            },
            Vec::new(),
        );
        run.finish(RunStatus::Failed);

        let restored = PipelineRun::try_from(row_from(&run)).unwrap();
        assert_eq!(restored, run);
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let run = PipelineRun::new(Trigger::new("acme", "shop", "main", "abc123"));
        let mut row = row_from(&run);
        row.status = "Paused".to_string();

        assert!(matches!(
            PipelineRun::try_from(row),
            Err(RepositoryError::Backend(_))
        ));
    }
}
