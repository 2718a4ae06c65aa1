//! Migration invocation stage
//!
//! Synchronously runs the migration unit and treats anything short of a
//! clean response within the bound as a stage failure.

use relay_core::domain::grant::{Action, Principal, Resource};
use relay_core::domain::unit::{InvocationResult, UnitRole};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::context::StageLog;
use crate::error::StageError;
use crate::permissions::PermissionModel;
use crate::registry::{ComputeRegistry, RegistryError};

pub struct MigrationStage {
    registry: Arc<dyn ComputeRegistry>,
    permissions: Arc<PermissionModel>,
    timeout: Duration,
}

impl MigrationStage {
    pub fn new(
        registry: Arc<dyn ComputeRegistry>,
        permissions: Arc<PermissionModel>,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            permissions,
            timeout,
        }
    }

    /// Invokes the migration unit and waits for its result
    pub async fn invoke(
        &self,
        unit_name: &str,
        payload: JsonValue,
        log: &StageLog,
    ) -> Result<InvocationResult, StageError> {
        self.permissions.authorize(
            Principal::PipelineRole,
            Resource::Unit(UnitRole::Migration),
            Action::InvokeFunction,
        )?;

        log.log_info(format!("Invoking {}", unit_name));

        let result = tokio::time::timeout(self.timeout, self.registry.invoke_unit(unit_name, payload))
            .await
            .map_err(|_| {
                warn!("Migration {} exceeded {:?}", unit_name, self.timeout);
                StageError::Timeout(self.timeout)
            })?
            .map_err(|e| match e {
                RegistryError::NotFound(name) => {
                    StageError::NotFound(format!("compute unit '{}'", name))
                }
                other => StageError::InvocationFailure {
                    cause: other.to_string(),
                },
            })?;

        if let Some(cause) = &result.function_error {
            log.log_error(format!("Migration failed: {}", cause));
            return Err(StageError::InvocationFailure {
                cause: cause.clone(),
            });
        }
        if !result.is_success() {
            return Err(StageError::InvocationFailure {
                cause: format!("unit answered with status {}", result.status_code),
            });
        }

        info!("Migration {} completed", unit_name);
        log.log_info("Migrations applied");

        Ok(result)
    }
}
