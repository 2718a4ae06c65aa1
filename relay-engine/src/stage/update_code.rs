//! Code update stage
//!
//! Repoints one compute unit at the run's artifact. The deployer principal
//! is scoped to its own unit, so a misrouted update is denied instead of
//! silently touching another unit.

use relay_core::domain::artifact::Artifact;
use relay_core::domain::grant::{Action, Principal, Resource};
use relay_core::domain::unit::{Ack, UnitRole};
use std::sync::Arc;
use tracing::info;

use crate::context::StageLog;
use crate::error::StageError;
use crate::permissions::PermissionModel;
use crate::registry::{ComputeRegistry, RegistryError};

pub struct CodeUpdateStage {
    registry: Arc<dyn ComputeRegistry>,
    permissions: Arc<PermissionModel>,
}

impl CodeUpdateStage {
    pub fn new(registry: Arc<dyn ComputeRegistry>, permissions: Arc<PermissionModel>) -> Self {
        Self {
            registry,
            permissions,
        }
    }

    /// Points `unit_name` (a unit of `role`) at `artifact`
    ///
    /// Repeating the update with the same artifact succeeds with
    /// [`Ack::Unchanged`].
    pub async fn update_code(
        &self,
        role: UnitRole,
        unit_name: &str,
        artifact: &Artifact,
        log: &StageLog,
    ) -> Result<Ack, StageError> {
        let principal = Principal::CodeDeployer(role);
        self.permissions
            .authorize(principal, Resource::ArtifactStore, Action::ArtifactRead)?;
        self.permissions
            .authorize(principal, Resource::Unit(role), Action::UpdateFunctionCode)?;

        let unit = self.registry.get_unit(unit_name).await.map_err(map_registry_error)?;
        if unit.role != role {
            return Err(StageError::NotFound(format!(
                "unit '{}' is a {} unit, expected {}",
                unit_name, unit.role, role
            )));
        }

        if unit.code_version.as_ref() == Some(&artifact.version) {
            log.log_info(format!("{} already runs {}", unit_name, artifact.reference()));
            return Ok(Ack::Unchanged);
        }

        log.log_info(format!("Updating {} to {}", unit_name, artifact.reference()));
        let ack = self
            .registry
            .update_unit_code(unit_name, &artifact.reference())
            .await
            .map_err(map_registry_error)?;

        if let Ack::Updated { previous } = &ack {
            info!(
                "Updated {} from {} to {}",
                unit_name,
                previous.as_ref().map_or("nothing", |v| v.as_str()),
                artifact.version
            );
        }

        Ok(ack)
    }
}

fn map_registry_error(error: RegistryError) -> StageError {
    match error {
        RegistryError::NotFound(name) => StageError::NotFound(format!("compute unit '{}'", name)),
        other => StageError::UploadFailure(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReleaseTargets;
    use crate::registry::InMemoryComputeRegistry;
    use crate::testing::artifact;
    use relay_core::domain::artifact::ArtifactVersion;

    fn stage() -> (CodeUpdateStage, Arc<InMemoryComputeRegistry>) {
        let registry = Arc::new(InMemoryComputeRegistry::seeded(&ReleaseTargets::default()));
        let stage = CodeUpdateStage::new(registry.clone(), Arc::new(PermissionModel::default()));
        (stage, registry)
    }

    #[tokio::test]
    async fn test_update_is_idempotent() {
        let (stage, registry) = stage();
        let artifact = artifact("v1");

        let first = stage
            .update_code(UnitRole::Application, "DeployedLambda", &artifact, &StageLog::new())
            .await
            .unwrap();
        assert_eq!(first, Ack::Updated { previous: None });

        let second = stage
            .update_code(UnitRole::Application, "DeployedLambda", &artifact, &StageLog::new())
            .await
            .unwrap();
        assert_eq!(second, Ack::Unchanged);

        let unit = registry.get_unit("DeployedLambda").await.unwrap();
        assert_eq!(unit.code_version, Some(ArtifactVersion::new("v1")));
    }

    #[tokio::test]
    async fn test_missing_unit_is_not_found() {
        let (stage, _) = stage();

        let err = stage
            .update_code(UnitRole::Cleanup, "NoSuchLambda", &artifact("v1"), &StageLog::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_role_mismatch_is_rejected() {
        let (stage, registry) = stage();

        let err = stage
            .update_code(UnitRole::Cleanup, "DeployedLambda", &artifact("v1"), &StageLog::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::NotFound(_)));

        let unit = registry.get_unit("DeployedLambda").await.unwrap();
        assert_eq!(unit.code_version, None);
    }

    #[tokio::test]
    async fn test_deployer_without_grant_is_denied() {
        let registry = Arc::new(InMemoryComputeRegistry::seeded(&ReleaseTargets::default()));
        let mut model = PermissionModel::default();
        model.revoke(
            Principal::CodeDeployer(UnitRole::Migration),
            Resource::Unit(UnitRole::Migration),
            Action::UpdateFunctionCode,
        );
        let stage = CodeUpdateStage::new(registry.clone(), Arc::new(model));

        let err = stage
            .update_code(UnitRole::Migration, "MigrationLambda", &artifact("v1"), &StageLog::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::PermissionDenied { .. }));

        let unit = registry.get_unit("MigrationLambda").await.unwrap();
        assert_eq!(unit.code_version, None);
    }
}
