//! Shared application state
//!
//! Wires the engine's collaborators according to the configuration and
//! hands the pieces the HTTP layer needs to every handler.

use anyhow::{Context, Result};
use relay_engine::build::ShellBuild;
use relay_engine::registry::{ComputeRegistry, HttpComputeRegistry, InMemoryComputeRegistry};
use relay_engine::repository::{InMemoryRunRepository, RunRepository};
use relay_engine::secrets::EnvSecretProvider;
use relay_engine::source::GitSourceFetcher;
use relay_engine::store::FsArtifactStore;
use relay_engine::{
    MaintenanceSchedule, PermissionModel, PipelineScheduler, ReleaseTargets, ReleaseTrain,
    SchedulerDeps,
};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::config::{Config, SourceRepository};
use crate::db;
use crate::repository::PgRunRepository;

/// Secret id of the source-control token
const SOURCE_CREDENTIAL: &str = "github-pat";

#[derive(Clone)]
pub struct AppState {
    pub train: Arc<ReleaseTrain>,
    pub runs: Arc<dyn RunRepository>,
    pub registry: Arc<dyn ComputeRegistry>,
    pub permissions: Arc<PermissionModel>,
    pub targets: ReleaseTargets,
    pub source: SourceRepository,
    /// Shared secret push events are signed with; unsigned events are accepted when unset
    pub webhook_secret: Option<String>,
}

/// Background tasks owned by the running orchestrator
pub struct Workers {
    pub train: JoinHandle<()>,
    pub maintenance: Option<JoinHandle<()>>,
}

impl AppState {
    /// Builds the state from configuration and starts the release train
    pub async fn from_config(config: &Config) -> Result<(Self, Workers)> {
        let runs: Arc<dyn RunRepository> = match &config.database_url {
            Some(url) => {
                tracing::info!("Connecting to database...");
                let pool = db::create_pool(url)
                    .await
                    .context("Failed to create database pool")?;
                db::run_migrations(&pool)
                    .await
                    .context("Failed to run database migrations")?;
                Arc::new(PgRunRepository::new(pool))
            }
            None => {
                tracing::warn!("DATABASE_URL not set; run history is kept in memory");
                Arc::new(InMemoryRunRepository::new())
            }
        };

        let registry: Arc<dyn ComputeRegistry> = match &config.registry_url {
            Some(url) => Arc::new(HttpComputeRegistry::new(url.clone())),
            None => {
                tracing::warn!("REGISTRY_URL not set; using an in-process compute registry");
                Arc::new(InMemoryComputeRegistry::seeded(&config.targets))
            }
        };

        tokio::fs::create_dir_all(&config.artifact_dir)
            .await
            .with_context(|| {
                format!(
                    "Failed to create artifact directory {}",
                    config.artifact_dir.display()
                )
            })?;
        let store = FsArtifactStore::new(config.artifact_dir.clone());

        let permissions = Arc::new(PermissionModel::provision(&config.topology));

        let build = ShellBuild::new(
            config.build_commands.clone(),
            config.build_output.clone(),
            config.build_timeout,
        )
        .with_env("ARTIFACT_NAME", config.artifact_name.clone());

        let deps = SchedulerDeps {
            fetcher: Arc::new(GitSourceFetcher::new(
                config.workspace_dir.clone(),
                Arc::new(EnvSecretProvider),
                SOURCE_CREDENTIAL,
            )),
            build: Arc::new(build),
            store: Arc::new(store),
            registry: registry.clone(),
            permissions: permissions.clone(),
            runs: runs.clone(),
        };

        let scheduler = Arc::new(PipelineScheduler::new(deps, config.pipeline_settings()));
        let (train, train_worker) = ReleaseTrain::start(scheduler);

        let maintenance = config.cleanup_interval.map(|interval| {
            MaintenanceSchedule::new(
                registry.clone(),
                permissions.clone(),
                config.targets.cleanup.clone(),
                interval,
            )
            .spawn()
        });

        let state = Self {
            train: Arc::new(train),
            runs,
            registry,
            permissions,
            targets: config.targets.clone(),
            source: config.source.clone(),
            webhook_secret: config.webhook_secret.clone(),
        };

        Ok((
            state,
            Workers {
                train: train_worker,
                maintenance,
            },
        ))
    }
}
