//! Release settings
//!
//! Names and bounds the scheduler needs at run time. Provisioning-time
//! choices (network placement, proxy vs direct database access) live in the
//! orchestrator configuration and the permission topology instead.

use relay_core::domain::unit::UnitRole;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Registry names of the three units the release repoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseTargets {
    pub application: String,
    pub migration: String,
    pub cleanup: String,
}

impl ReleaseTargets {
    pub fn name_for(&self, role: UnitRole) -> &str {
        match role {
            UnitRole::Application => &self.application,
            UnitRole::Migration => &self.migration,
            UnitRole::Cleanup => &self.cleanup,
        }
    }
}

impl Default for ReleaseTargets {
    fn default() -> Self {
        Self {
            application: "DeployedLambda".to_string(),
            migration: "MigrationLambda".to_string(),
            cleanup: "CleanUpLambda".to_string(),
        }
    }
}

/// Settings shared by every pipeline run
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Logical name of the deployment package in the artifact store
    pub artifact_name: String,

    pub targets: ReleaseTargets,

    /// Upper bound for the synchronous migration invocation
    pub migration_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            artifact_name: "lambda.zip".to_string(),
            targets: ReleaseTargets::default(),
            migration_timeout: Duration::from_secs(120),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_names() {
        let targets = ReleaseTargets::default();
        assert_eq!(targets.name_for(UnitRole::Migration), "MigrationLambda");
        assert_eq!(targets.name_for(UnitRole::Application), "DeployedLambda");
        assert_eq!(targets.name_for(UnitRole::Cleanup), "CleanUpLambda");
    }
}
