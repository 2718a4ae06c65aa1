//! In-memory compute registry
//!
//! Keeps unit state in process. Invocations are served by per-unit handlers;
//! units without a handler answer with an empty success payload.

use async_trait::async_trait;
use relay_core::domain::artifact::ArtifactRef;
use relay_core::domain::unit::{Ack, ComputeUnit, InvocationResult, UnitRole};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

use super::{ComputeRegistry, RegistryError};
use crate::config::ReleaseTargets;

/// Serves invocations of one unit
#[async_trait]
pub trait UnitHandler: Send + Sync {
    async fn handle(&self, unit: &ComputeUnit, payload: JsonValue) -> InvocationResult;
}

/// Adapts a synchronous closure into a [`UnitHandler`]
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F> UnitHandler for FnHandler<F>
where
    F: Fn(&ComputeUnit, JsonValue) -> InvocationResult + Send + Sync,
{
    async fn handle(&self, unit: &ComputeUnit, payload: JsonValue) -> InvocationResult {
        (self.0)(unit, payload)
    }
}

#[derive(Default)]
pub struct InMemoryComputeRegistry {
    units: RwLock<HashMap<String, ComputeUnit>>,
    handlers: RwLock<HashMap<String, Arc<dyn UnitHandler>>>,
    invocations: RwLock<Vec<String>>,
}

impl InMemoryComputeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the three release targets with no code deployed
    pub fn seeded(targets: &ReleaseTargets) -> Self {
        let registry = Self::new();
        for role in UnitRole::ALL {
            registry.register(ComputeUnit::new(targets.name_for(role), role));
        }
        registry
    }

    /// Adds or replaces a unit
    pub fn register(&self, unit: ComputeUnit) {
        self.units
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(unit.name.clone(), unit);
    }

    pub fn set_handler(&self, name: impl Into<String>, handler: Arc<dyn UnitHandler>) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), handler);
    }

    /// Names of invoked units, in invocation order
    pub fn invocations(&self) -> Vec<String> {
        self.invocations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn unit(&self, name: &str) -> Result<ComputeUnit, RegistryError> {
        self.units
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }
}

#[async_trait]
impl ComputeRegistry for InMemoryComputeRegistry {
    async fn get_unit(&self, name: &str) -> Result<ComputeUnit, RegistryError> {
        self.unit(name)
    }

    async fn update_unit_code(
        &self,
        name: &str,
        artifact: &ArtifactRef,
    ) -> Result<Ack, RegistryError> {
        let mut units = self.units.write().unwrap_or_else(PoisonError::into_inner);
        let unit = units
            .get_mut(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;

        if unit.code_version.as_ref() == Some(&artifact.version) {
            debug!("Unit {} already runs {}", name, artifact);
            return Ok(Ack::Unchanged);
        }

        let previous = unit.code_version.replace(artifact.version.clone());
        info!("Unit {} now runs {}", name, artifact);

        Ok(Ack::Updated { previous })
    }

    async fn invoke_unit(
        &self,
        name: &str,
        payload: JsonValue,
    ) -> Result<InvocationResult, RegistryError> {
        let unit = self.unit(name)?;
        let handler = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned();

        self.invocations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(name.to_string());

        match handler {
            Some(handler) => Ok(handler.handle(&unit, payload).await),
            None => Ok(InvocationResult::ok(JsonValue::Null)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::domain::artifact::ArtifactVersion;

    fn artifact(version: &str) -> ArtifactRef {
        ArtifactRef {
            name: "lambda.zip".to_string(),
            version: ArtifactVersion::new(version),
        }
    }

    #[tokio::test]
    async fn test_update_is_idempotent() {
        let registry = InMemoryComputeRegistry::seeded(&ReleaseTargets::default());

        let first = registry
            .update_unit_code("MigrationLambda", &artifact("v1"))
            .await
            .unwrap();
        assert_eq!(first, Ack::Updated { previous: None });

        let second = registry
            .update_unit_code("MigrationLambda", &artifact("v1"))
            .await
            .unwrap();
        assert_eq!(second, Ack::Unchanged);

        let third = registry
            .update_unit_code("MigrationLambda", &artifact("v2"))
            .await
            .unwrap();
        assert_eq!(
            third,
            Ack::Updated {
                previous: Some(ArtifactVersion::new("v1"))
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_unit() {
        let registry = InMemoryComputeRegistry::new();
        let err = registry
            .update_unit_code("Missing", &artifact("v1"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(name) if name == "Missing"));
    }

    #[tokio::test]
    async fn test_invoke_uses_handler() {
        let registry = InMemoryComputeRegistry::seeded(&ReleaseTargets::default());
        registry.set_handler(
            "MigrationLambda",
            Arc::new(FnHandler(|unit: &ComputeUnit, _payload: JsonValue| {
                InvocationResult::ok(serde_json::json!({ "handler": unit.handler }))
            })),
        );

        let result = registry
            .invoke_unit("MigrationLambda", JsonValue::Null)
            .await
            .unwrap();
        assert_eq!(result.payload["handler"], "migrate.handler");

        let default = registry
            .invoke_unit("CleanUpLambda", JsonValue::Null)
            .await
            .unwrap();
        assert!(default.is_success());
        assert_eq!(
            registry.invocations(),
            vec!["MigrationLambda".to_string(), "CleanUpLambda".to_string()]
        );
    }
}
