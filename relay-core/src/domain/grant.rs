//! Grant domain types
//!
//! A grant authorizes one principal to perform a set of actions on one
//! resource. Grants are computed at provisioning time and only read while a
//! release runs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::domain::unit::UnitRole;

/// Identity that performs actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Principal {
    /// Role assumed by a compute unit at run time
    ExecutionRole(UnitRole),
    /// Identity of the build stage
    BuildProject,
    /// Identity of the code-update stage targeting one unit
    CodeDeployer(UnitRole),
    /// Identity of the release pipeline itself (source fetch, migration invoke)
    PipelineRole,
    /// Periodic timer that invokes the cleanup unit
    MaintenanceSchedule,
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Principal::ExecutionRole(role) => write!(f, "execution-role:{}", role),
            Principal::BuildProject => write!(f, "build-project"),
            Principal::CodeDeployer(role) => write!(f, "code-deployer:{}", role),
            Principal::PipelineRole => write!(f, "pipeline-role"),
            Principal::MaintenanceSchedule => write!(f, "maintenance-schedule"),
        }
    }
}

impl std::str::FromStr for Principal {
    type Err = String;

    /// Parses the display form, e.g. `code-deployer:migration`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, role) = match s.split_once(':') {
            Some((kind, role)) => (kind, Some(role.parse::<UnitRole>()?)),
            None => (s, None),
        };

        match (kind, role) {
            ("execution-role", Some(role)) => Ok(Principal::ExecutionRole(role)),
            ("code-deployer", Some(role)) => Ok(Principal::CodeDeployer(role)),
            ("build-project", None) => Ok(Principal::BuildProject),
            ("pipeline-role", None) => Ok(Principal::PipelineRole),
            ("maintenance-schedule", None) => Ok(Principal::MaintenanceSchedule),
            _ => Err(format!("unknown principal '{}'", s)),
        }
    }
}

/// Something a principal acts upon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resource {
    ArtifactStore,
    DatabaseSecret,
    Database,
    EmailTopic,
    PushPlatform,
    IdentityPool,
    NetworkInterfaces,
    TaskCallbacks,
    LogStreams,
    SourceCredentials,
    Unit(UnitRole),
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resource::ArtifactStore => write!(f, "artifact-store"),
            Resource::DatabaseSecret => write!(f, "database-secret"),
            Resource::Database => write!(f, "database"),
            Resource::EmailTopic => write!(f, "email-topic"),
            Resource::PushPlatform => write!(f, "push-platform"),
            Resource::IdentityPool => write!(f, "identity-pool"),
            Resource::NetworkInterfaces => write!(f, "network-interfaces"),
            Resource::TaskCallbacks => write!(f, "task-callbacks"),
            Resource::LogStreams => write!(f, "log-streams"),
            Resource::SourceCredentials => write!(f, "source-credentials"),
            Resource::Unit(role) => write!(f, "unit:{}", role),
        }
    }
}

/// Permitted operation on a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Action {
    ArtifactRead,
    ArtifactWrite,
    SecretRead,
    DatabaseConnect,
    TopicPublish,
    TopicSubscribe,
    CreatePlatformEndpoint,
    DeleteEndpoint,
    GetEndpointAttributes,
    SetEndpointAttributes,
    AdminCreateUser,
    AdminGetUser,
    AdminUpdateUserAttributes,
    AdminInitiateAuth,
    ListUsers,
    CreateNetworkInterface,
    DescribeNetworkInterfaces,
    DeleteNetworkInterface,
    SendTaskSuccess,
    SendTaskFailure,
    CreateLogStream,
    PutLogEvents,
    UpdateFunctionCode,
    InvokeFunction,
}

impl Action {
    /// IAM-style action name
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ArtifactRead => "s3:GetObject",
            Action::ArtifactWrite => "s3:PutObject",
            Action::SecretRead => "secretsmanager:GetSecretValue",
            Action::DatabaseConnect => "rds-db:connect",
            Action::TopicPublish => "sns:Publish",
            Action::TopicSubscribe => "sns:Subscribe",
            Action::CreatePlatformEndpoint => "sns:CreatePlatformEndpoint",
            Action::DeleteEndpoint => "sns:DeleteEndpoint",
            Action::GetEndpointAttributes => "sns:GetEndpointAttributes",
            Action::SetEndpointAttributes => "sns:SetEndpointAttributes",
            Action::AdminCreateUser => "cognito-idp:AdminCreateUser",
            Action::AdminGetUser => "cognito-idp:AdminGetUser",
            Action::AdminUpdateUserAttributes => "cognito-idp:AdminUpdateUserAttributes",
            Action::AdminInitiateAuth => "cognito-idp:AdminInitiateAuth",
            Action::ListUsers => "cognito-idp:ListUsers",
            Action::CreateNetworkInterface => "ec2:CreateNetworkInterface",
            Action::DescribeNetworkInterfaces => "ec2:DescribeNetworkInterfaces",
            Action::DeleteNetworkInterface => "ec2:DeleteNetworkInterface",
            Action::SendTaskSuccess => "states:SendTaskSuccess",
            Action::SendTaskFailure => "states:SendTaskFailure",
            Action::CreateLogStream => "logs:CreateLogStream",
            Action::PutLogEvents => "logs:PutLogEvents",
            Action::UpdateFunctionCode => "lambda:UpdateFunctionCode",
            Action::InvokeFunction => "lambda:InvokeFunction",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authorization triple: principal, resource, allowed actions
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Grant {
    pub principal: Principal,
    pub resource: Resource,
    pub actions: BTreeSet<Action>,
}

impl Grant {
    pub fn allows(&self, resource: Resource, action: Action) -> bool {
        self.resource == resource && self.actions.contains(&action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_allows() {
        let grant = Grant {
            principal: Principal::CodeDeployer(UnitRole::Migration),
            resource: Resource::Unit(UnitRole::Migration),
            actions: BTreeSet::from([Action::UpdateFunctionCode]),
        };

        assert!(grant.allows(Resource::Unit(UnitRole::Migration), Action::UpdateFunctionCode));
        assert!(!grant.allows(Resource::Unit(UnitRole::Application), Action::UpdateFunctionCode));
        assert!(!grant.allows(Resource::Unit(UnitRole::Migration), Action::InvokeFunction));
    }

    #[test]
    fn test_principal_display() {
        assert_eq!(
            Principal::ExecutionRole(UnitRole::Cleanup).to_string(),
            "execution-role:cleanup"
        );
        assert_eq!(Principal::PipelineRole.to_string(), "pipeline-role");
    }

    #[test]
    fn test_principal_parses_display_form() {
        for principal in [
            Principal::ExecutionRole(UnitRole::Application),
            Principal::BuildProject,
            Principal::CodeDeployer(UnitRole::Migration),
            Principal::PipelineRole,
            Principal::MaintenanceSchedule,
        ] {
            assert_eq!(principal.to_string().parse::<Principal>(), Ok(principal));
        }
        assert!("code-deployer".parse::<Principal>().is_err());
        assert!("pipeline-role:cleanup".parse::<Principal>().is_err());
        assert!("admin".parse::<Principal>().is_err());
    }
}
