//! Permission grant model
//!
//! Which principal may do what is a static function of the deployment
//! topology. The whole wiring lives in one rule table; provisioning expands it
//! once and the resulting model is only queried while releases run.

use relay_core::domain::grant::{Action, Grant, Principal, Resource};
use relay_core::domain::unit::UnitRole;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::error::StageError;

/// Provisioning-time features that add grants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topology {
    /// Units are attached to a private network and manage their own interfaces
    pub vpc_attached: bool,
    /// Email topic and push platform are provisioned
    pub notifications: bool,
    /// The identity provider user pool is provisioned
    pub identity_pool: bool,
    /// The migration unit reports completion through task callbacks
    pub migration_callback: bool,
    /// The cleanup unit is invoked by a periodic schedule
    pub maintenance_schedule: bool,
}

impl Default for Topology {
    fn default() -> Self {
        Self {
            vpc_attached: true,
            notifications: true,
            identity_pool: true,
            migration_callback: true,
            maintenance_schedule: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Feature {
    Always,
    Vpc,
    Notifications,
    IdentityPool,
    MigrationCallback,
    Maintenance,
}

impl Topology {
    fn enables(&self, feature: Feature) -> bool {
        match feature {
            Feature::Always => true,
            Feature::Vpc => self.vpc_attached,
            Feature::Notifications => self.notifications,
            Feature::IdentityPool => self.identity_pool,
            Feature::MigrationCallback => self.migration_callback,
            Feature::Maintenance => self.maintenance_schedule,
        }
    }
}

struct Rule {
    principals: &'static [Principal],
    resource: Resource,
    actions: &'static [Action],
    feature: Feature,
}

const EXECUTION_ROLES: &[Principal] = &[
    Principal::ExecutionRole(UnitRole::Application),
    Principal::ExecutionRole(UnitRole::Migration),
    Principal::ExecutionRole(UnitRole::Cleanup),
];

const APPLICATION: &[Principal] = &[Principal::ExecutionRole(UnitRole::Application)];

const CODE_DEPLOYERS: &[Principal] = &[
    Principal::CodeDeployer(UnitRole::Application),
    Principal::CodeDeployer(UnitRole::Migration),
    Principal::CodeDeployer(UnitRole::Cleanup),
];

const RULES: &[Rule] = &[
    Rule {
        principals: EXECUTION_ROLES,
        resource: Resource::LogStreams,
        actions: &[Action::CreateLogStream, Action::PutLogEvents],
        feature: Feature::Always,
    },
    Rule {
        principals: EXECUTION_ROLES,
        resource: Resource::DatabaseSecret,
        actions: &[Action::SecretRead],
        feature: Feature::Always,
    },
    Rule {
        principals: EXECUTION_ROLES,
        resource: Resource::Database,
        actions: &[Action::DatabaseConnect],
        feature: Feature::Always,
    },
    Rule {
        principals: EXECUTION_ROLES,
        resource: Resource::NetworkInterfaces,
        actions: &[
            Action::CreateNetworkInterface,
            Action::DescribeNetworkInterfaces,
            Action::DeleteNetworkInterface,
        ],
        feature: Feature::Vpc,
    },
    Rule {
        principals: APPLICATION,
        resource: Resource::ArtifactStore,
        actions: &[Action::ArtifactRead, Action::ArtifactWrite],
        feature: Feature::Always,
    },
    Rule {
        principals: APPLICATION,
        resource: Resource::EmailTopic,
        actions: &[Action::TopicPublish, Action::TopicSubscribe],
        feature: Feature::Notifications,
    },
    Rule {
        principals: APPLICATION,
        resource: Resource::PushPlatform,
        actions: &[
            Action::CreatePlatformEndpoint,
            Action::TopicPublish,
            Action::DeleteEndpoint,
            Action::GetEndpointAttributes,
            Action::SetEndpointAttributes,
        ],
        feature: Feature::Notifications,
    },
    Rule {
        principals: APPLICATION,
        resource: Resource::IdentityPool,
        actions: &[
            Action::AdminCreateUser,
            Action::AdminGetUser,
            Action::AdminUpdateUserAttributes,
            Action::AdminInitiateAuth,
            Action::ListUsers,
        ],
        feature: Feature::IdentityPool,
    },
    Rule {
        principals: &[Principal::ExecutionRole(UnitRole::Migration)],
        resource: Resource::ArtifactStore,
        actions: &[Action::ArtifactRead],
        feature: Feature::Always,
    },
    Rule {
        principals: &[Principal::ExecutionRole(UnitRole::Migration)],
        resource: Resource::TaskCallbacks,
        actions: &[Action::SendTaskSuccess, Action::SendTaskFailure],
        feature: Feature::MigrationCallback,
    },
    Rule {
        principals: &[Principal::BuildProject],
        resource: Resource::ArtifactStore,
        actions: &[Action::ArtifactRead, Action::ArtifactWrite],
        feature: Feature::Always,
    },
    Rule {
        principals: CODE_DEPLOYERS,
        resource: Resource::ArtifactStore,
        actions: &[Action::ArtifactRead],
        feature: Feature::Always,
    },
    Rule {
        principals: &[Principal::CodeDeployer(UnitRole::Migration)],
        resource: Resource::Unit(UnitRole::Migration),
        actions: &[Action::UpdateFunctionCode],
        feature: Feature::Always,
    },
    Rule {
        principals: &[Principal::CodeDeployer(UnitRole::Application)],
        resource: Resource::Unit(UnitRole::Application),
        actions: &[Action::UpdateFunctionCode],
        feature: Feature::Always,
    },
    Rule {
        principals: &[Principal::CodeDeployer(UnitRole::Cleanup)],
        resource: Resource::Unit(UnitRole::Cleanup),
        actions: &[Action::UpdateFunctionCode],
        feature: Feature::Always,
    },
    Rule {
        principals: &[Principal::PipelineRole],
        resource: Resource::SourceCredentials,
        actions: &[Action::SecretRead],
        feature: Feature::Always,
    },
    Rule {
        principals: &[Principal::PipelineRole],
        resource: Resource::Unit(UnitRole::Migration),
        actions: &[Action::InvokeFunction],
        feature: Feature::Always,
    },
    Rule {
        principals: &[Principal::MaintenanceSchedule],
        resource: Resource::Unit(UnitRole::Cleanup),
        actions: &[Action::InvokeFunction],
        feature: Feature::Maintenance,
    },
];

/// Grants computed from the rule table for one topology
#[derive(Debug, Clone)]
pub struct PermissionModel {
    grants: BTreeMap<Principal, BTreeMap<Resource, BTreeSet<Action>>>,
}

impl PermissionModel {
    /// Expands the rule table for `topology`
    pub fn provision(topology: &Topology) -> Self {
        let mut grants: BTreeMap<Principal, BTreeMap<Resource, BTreeSet<Action>>> =
            BTreeMap::new();

        for rule in RULES.iter().filter(|r| topology.enables(r.feature)) {
            for principal in rule.principals {
                grants
                    .entry(*principal)
                    .or_default()
                    .entry(rule.resource)
                    .or_default()
                    .extend(rule.actions.iter().copied());
            }
        }

        debug!("Provisioned grants for {} principal(s)", grants.len());

        Self { grants }
    }

    /// All grants held by `principal`
    pub fn grants_for(&self, principal: Principal) -> BTreeSet<Grant> {
        self.grants
            .get(&principal)
            .map(|resources| {
                resources
                    .iter()
                    .map(|(resource, actions)| Grant {
                        principal,
                        resource: *resource,
                        actions: actions.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every grant, ordered by principal then resource
    pub fn all_grants(&self) -> Vec<Grant> {
        self.grants
            .keys()
            .flat_map(|principal| self.grants_for(*principal))
            .collect()
    }

    pub fn is_allowed(&self, principal: Principal, resource: Resource, action: Action) -> bool {
        self.grants
            .get(&principal)
            .and_then(|resources| resources.get(&resource))
            .is_some_and(|actions| actions.contains(&action))
    }

    /// Removes one action from a principal's grant on `resource`
    #[cfg(test)]
    pub fn revoke(&mut self, principal: Principal, resource: Resource, action: Action) {
        if let Some(resources) = self.grants.get_mut(&principal) {
            if let Some(actions) = resources.get_mut(&resource) {
                actions.remove(&action);
                if actions.is_empty() {
                    resources.remove(&resource);
                }
            }
            if resources.is_empty() {
                self.grants.remove(&principal);
            }
        }
    }

    /// Fails with `PermissionDenied` unless a grant authorizes the action
    pub fn authorize(
        &self,
        principal: Principal,
        resource: Resource,
        action: Action,
    ) -> Result<(), StageError> {
        if self.is_allowed(principal, resource, action) {
            Ok(())
        } else {
            Err(StageError::PermissionDenied {
                principal,
                resource,
                action,
            })
        }
    }
}

impl Default for PermissionModel {
    fn default() -> Self {
        Self::provision(&Topology::default())
    }
}
