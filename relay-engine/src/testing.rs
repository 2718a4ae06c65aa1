//! Test doubles shared by the engine's unit tests

use async_trait::async_trait;
use relay_core::domain::artifact::{Artifact, ArtifactVersion};
use relay_core::domain::source::{SourceSnapshot, Trigger};
use relay_core::domain::unit::{ComputeUnit, InvocationResult, UnitRole};
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::build::BuildProcedure;
use crate::config::PipelineSettings;
use crate::context::StageLog;
use crate::error::StageError;
use crate::permissions::PermissionModel;
use crate::registry::{ComputeRegistry, FnHandler, InMemoryComputeRegistry, UnitHandler};
use crate::repository::InMemoryRunRepository;
use crate::scheduler::{PipelineScheduler, SchedulerDeps};
use crate::source::SourceFetcher;
use crate::store::{ArtifactStore, InMemoryArtifactStore};

pub fn snapshot(commit: &str) -> SourceSnapshot {
    SourceSnapshot {
        commit_ref: commit.to_string(),
        branch: "main".to_string(),
        workdir: None,
        fetched_at: chrono::Utc::now(),
    }
}

pub fn artifact(version: &str) -> Artifact {
    Artifact {
        name: "lambda.zip".to_string(),
        version: ArtifactVersion::new(version),
        source_commit: "abc123".to_string(),
        digest: "0".repeat(64),
        size_bytes: 7,
        created_at: chrono::Utc::now(),
    }
}

/// Fetcher that resolves every commit except the ones marked missing
#[derive(Default)]
pub struct FakeFetcher {
    missing: HashSet<String>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn missing(mut self, commit: &str) -> Self {
        self.missing.insert(commit.to_string());
        self
    }
}

#[async_trait]
impl SourceFetcher for FakeFetcher {
    async fn fetch(&self, trigger: &Trigger) -> Result<SourceSnapshot, StageError> {
        if self.missing.contains(&trigger.commit_ref) {
            return Err(StageError::SourceUnavailable(format!(
                "reference {} not found",
                trigger.commit_ref
            )));
        }
        Ok(snapshot(&trigger.commit_ref))
    }
}

/// Build procedure that packages the commit id, optionally failing or
/// waiting on a gate before returning
#[derive(Default)]
pub struct FakeBuild {
    failure: Option<String>,
    gate: Option<Arc<Semaphore>>,
    pub started: AtomicUsize,
}

impl FakeBuild {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, reason: &str) -> Self {
        self.failure = Some(reason.to_string());
        self
    }

    /// Each build consumes one permit of `gate` before finishing
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl BuildProcedure for FakeBuild {
    async fn build(
        &self,
        snapshot: &SourceSnapshot,
        log: &StageLog,
    ) -> Result<Vec<u8>, StageError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        log.log_info(format!("packaging {}", snapshot.commit_ref));

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        match &self.failure {
            Some(reason) => Err(StageError::BuildFailure {
                exit_reason: reason.clone(),
            }),
            None => Ok(format!("package-{}", snapshot.commit_ref).into_bytes()),
        }
    }
}

struct SlowHandler(Duration);

#[async_trait]
impl UnitHandler for SlowHandler {
    async fn handle(&self, _unit: &ComputeUnit, _payload: JsonValue) -> InvocationResult {
        tokio::time::sleep(self.0).await;
        InvocationResult::ok(JsonValue::Null)
    }
}

/// Scheduler wired to in-memory collaborators
pub struct Harness {
    pub scheduler: Arc<PipelineScheduler>,
    pub registry: Arc<InMemoryComputeRegistry>,
    pub store: Arc<InMemoryArtifactStore>,
    pub runs: Arc<InMemoryRunRepository>,
    pub build: Arc<FakeBuild>,
}

impl Harness {
    pub fn new() -> Self {
        Self::assemble(
            FakeFetcher::new(),
            FakeBuild::new(),
            PermissionModel::default(),
            PipelineSettings::default(),
        )
    }

    pub fn with_fetcher_missing(commit: &str) -> Self {
        Self::assemble(
            FakeFetcher::new().missing(commit),
            FakeBuild::new(),
            PermissionModel::default(),
            PipelineSettings::default(),
        )
    }

    pub fn with_failing_build(reason: &str) -> Self {
        Self::assemble(
            FakeFetcher::new(),
            FakeBuild::new().failing(reason),
            PermissionModel::default(),
            PipelineSettings::default(),
        )
    }

    pub fn with_gated_build(gate: Arc<Semaphore>) -> Self {
        Self::assemble(
            FakeFetcher::new(),
            FakeBuild::new().gated(gate),
            PermissionModel::default(),
            PipelineSettings::default(),
        )
    }

    pub fn with_permissions(permissions: PermissionModel) -> Self {
        Self::assemble(
            FakeFetcher::new(),
            FakeBuild::new(),
            permissions,
            PipelineSettings::default(),
        )
    }

    pub fn with_migration_timeout(timeout: Duration) -> Self {
        Self::assemble(
            FakeFetcher::new(),
            FakeBuild::new(),
            PermissionModel::default(),
            PipelineSettings {
                migration_timeout: timeout,
                ..PipelineSettings::default()
            },
        )
    }

    fn assemble(
        fetcher: FakeFetcher,
        build: FakeBuild,
        permissions: PermissionModel,
        settings: PipelineSettings,
    ) -> Self {
        let registry = Arc::new(InMemoryComputeRegistry::seeded(&settings.targets));
        let store = Arc::new(InMemoryArtifactStore::new());
        let runs = Arc::new(InMemoryRunRepository::new());
        let build = Arc::new(build);

        let deps = SchedulerDeps {
            fetcher: Arc::new(fetcher),
            build: build.clone(),
            store: store.clone(),
            registry: registry.clone(),
            permissions: Arc::new(permissions),
            runs: runs.clone(),
        };

        Self {
            scheduler: Arc::new(PipelineScheduler::new(deps, settings)),
            registry,
            store,
            runs,
            build,
        }
    }

    pub async fn code_version(&self, role: UnitRole) -> Option<ArtifactVersion> {
        let name = self.scheduler.settings().targets.name_for(role);
        self.registry
            .get_unit(name)
            .await
            .ok()
            .and_then(|unit| unit.code_version)
    }

    pub fn migration_answers(&self, result: InvocationResult) {
        let name = self.scheduler.settings().targets.migration.clone();
        self.registry.set_handler(
            name,
            Arc::new(FnHandler(move |_: &ComputeUnit, _: JsonValue| result.clone())),
        );
    }

    pub fn migration_sleeps(&self, duration: Duration) {
        let name = self.scheduler.settings().targets.migration.clone();
        self.registry.set_handler(name, Arc::new(SlowHandler(duration)));
    }

    /// Stores `count` unrelated versions so the next build is not `v1`
    pub async fn store_seeded_versions(&self, count: usize) {
        let name = self.scheduler.settings().artifact_name.clone();
        for i in 0..count {
            let _ = self.store.put(&name, format!("old-{}", i).into_bytes()).await;
        }
    }
}
