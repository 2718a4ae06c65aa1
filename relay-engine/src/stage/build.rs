//! Build stage
//!
//! Runs the build procedure once per run, stores the package under the
//! configured artifact name and reads it back before reporting success, so
//! later stages only ever see a version that is durably readable.

use relay_core::domain::artifact::Artifact;
use relay_core::domain::grant::{Action, Principal, Resource};
use relay_core::domain::source::SourceSnapshot;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, warn};

use crate::build::BuildProcedure;
use crate::context::StageLog;
use crate::error::StageError;
use crate::permissions::PermissionModel;
use crate::store::ArtifactStore;

pub struct BuildStage {
    procedure: Arc<dyn BuildProcedure>,
    store: Arc<dyn ArtifactStore>,
    permissions: Arc<PermissionModel>,
    artifact_name: String,
}

impl BuildStage {
    pub fn new(
        procedure: Arc<dyn BuildProcedure>,
        store: Arc<dyn ArtifactStore>,
        permissions: Arc<PermissionModel>,
        artifact_name: impl Into<String>,
    ) -> Self {
        Self {
            procedure,
            store,
            permissions,
            artifact_name: artifact_name.into(),
        }
    }

    pub async fn run(&self, snapshot: &SourceSnapshot, log: &StageLog) -> Result<Artifact, StageError> {
        self.permissions.authorize(
            Principal::BuildProject,
            Resource::ArtifactStore,
            Action::ArtifactWrite,
        )?;
        self.permissions.authorize(
            Principal::BuildProject,
            Resource::ArtifactStore,
            Action::ArtifactRead,
        )?;

        log.log_info(format!("Building commit {}", snapshot.commit_ref));
        let bytes = self.procedure.build(snapshot, log).await?;

        let digest = hex::encode(Sha256::digest(&bytes));
        let size_bytes = bytes.len() as u64;

        let version = self
            .store
            .put(&self.artifact_name, bytes)
            .await
            .map_err(|e| StageError::UploadFailure(e.to_string()))?;

        let stored = self
            .store
            .get(&self.artifact_name, &version)
            .await
            .map_err(|e| StageError::UploadFailure(format!("readback failed: {}", e)))?;

        if hex::encode(Sha256::digest(&stored)) != digest {
            warn!("Readback of {}@{} does not match", self.artifact_name, version);
            return Err(StageError::UploadFailure(format!(
                "stored {}@{} does not match the built package",
                self.artifact_name, version
            )));
        }

        info!(
            "Stored {}@{} ({} bytes) from {}",
            self.artifact_name, version, size_bytes, snapshot.commit_ref
        );
        log.log_info(format!(
            "Uploaded {}@{} (sha256 {})",
            self.artifact_name, version, digest
        ));

        Ok(Artifact {
            name: self.artifact_name.clone(),
            version,
            source_commit: snapshot.commit_ref.clone(),
            digest,
            size_bytes,
            created_at: chrono::Utc::now(),
        })
    }
}
