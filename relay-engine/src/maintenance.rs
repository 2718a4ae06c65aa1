//! Maintenance schedule
//!
//! Periodically invokes the cleanup unit as the maintenance principal. The
//! schedule runs independently of the release lane.

use relay_core::domain::grant::{Action, Principal, Resource};
use relay_core::domain::unit::{InvocationResult, UnitRole};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, error, info};

use crate::error::StageError;
use crate::permissions::PermissionModel;
use crate::registry::ComputeRegistry;

pub struct MaintenanceSchedule {
    registry: Arc<dyn ComputeRegistry>,
    permissions: Arc<PermissionModel>,
    unit_name: String,
    interval: Duration,
}

impl MaintenanceSchedule {
    pub fn new(
        registry: Arc<dyn ComputeRegistry>,
        permissions: Arc<PermissionModel>,
        unit_name: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            permissions,
            unit_name: unit_name.into(),
            interval,
        }
    }

    /// Invokes the cleanup unit once
    pub async fn invoke_once(&self) -> Result<InvocationResult, StageError> {
        self.permissions.authorize(
            Principal::MaintenanceSchedule,
            Resource::Unit(UnitRole::Cleanup),
            Action::InvokeFunction,
        )?;

        let payload = json!({ "source": "maintenance-schedule", "time": chrono::Utc::now() });
        let result = self
            .registry
            .invoke_unit(&self.unit_name, payload)
            .await
            .map_err(|e| StageError::InvocationFailure {
                cause: e.to_string(),
            })?;

        match &result.function_error {
            Some(cause) => Err(StageError::InvocationFailure {
                cause: cause.clone(),
            }),
            None => Ok(result),
        }
    }

    /// Spawns the periodic loop; the first tick fires one interval from now
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "Maintenance schedule for {} every {:?}",
                self.unit_name, self.interval
            );
            let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);

            loop {
                ticker.tick().await;
                match self.invoke_once().await {
                    Ok(_) => debug!("Cleanup {} completed", self.unit_name),
                    Err(e) => error!("Cleanup {} failed: {}", self.unit_name, e),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReleaseTargets;
    use crate::permissions::Topology;
    use crate::registry::InMemoryComputeRegistry;

    #[tokio::test]
    async fn test_invokes_cleanup_unit() {
        let registry = Arc::new(InMemoryComputeRegistry::seeded(&ReleaseTargets::default()));
        let schedule = MaintenanceSchedule::new(
            registry.clone(),
            Arc::new(PermissionModel::default()),
            "CleanUpLambda",
            Duration::from_secs(3600),
        );

        schedule.invoke_once().await.unwrap();
        assert_eq!(registry.invocations(), vec!["CleanUpLambda".to_string()]);
    }

    #[tokio::test]
    async fn test_disabled_schedule_is_denied() {
        let registry = Arc::new(InMemoryComputeRegistry::seeded(&ReleaseTargets::default()));
        let topology = Topology {
            maintenance_schedule: false,
            ..Topology::default()
        };
        let schedule = MaintenanceSchedule::new(
            registry.clone(),
            Arc::new(PermissionModel::provision(&topology)),
            "CleanUpLambda",
            Duration::from_secs(3600),
        );

        let err = schedule.invoke_once().await.unwrap_err();
        assert!(matches!(err, StageError::PermissionDenied { .. }));
        assert!(registry.invocations().is_empty());
    }

    #[tokio::test]
    async fn test_spawned_schedule_ticks() {
        let registry = Arc::new(InMemoryComputeRegistry::seeded(&ReleaseTargets::default()));
        let handle = MaintenanceSchedule::new(
            registry.clone(),
            Arc::new(PermissionModel::default()),
            "CleanUpLambda",
            Duration::from_millis(30),
        )
        .spawn();

        assert!(registry.invocations().is_empty());
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.abort();

        assert!(registry.invocations().len() >= 2);
    }
}
