use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Stage records, snapshot, artifact and failure are stored as JSONB;
    // status and timestamps are columns so the release train can query them
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pipeline_runs (
            id UUID PRIMARY KEY,
            owner VARCHAR(255) NOT NULL,
            repo VARCHAR(255) NOT NULL,
            branch VARCHAR(255) NOT NULL,
            commit_ref VARCHAR(255) NOT NULL,
            status VARCHAR(50) NOT NULL,
            stages JSONB NOT NULL DEFAULT '[]',
            snapshot JSONB,
            artifact JSONB,
            live_version VARCHAR(255),
            failure JSONB,
            requested_at TIMESTAMPTZ NOT NULL,
            started_at TIMESTAMPTZ,
            completed_at TIMESTAMPTZ
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_pipeline_runs_status ON pipeline_runs(status)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_pipeline_runs_requested_at ON pipeline_runs(requested_at DESC)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
