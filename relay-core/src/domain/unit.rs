//! Compute unit domain model
//!
//! A compute unit is a named deployable function. Three exist in steady state
//! and all of them run code from the same packaged artifact.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::artifact::ArtifactVersion;

/// Which of the three steady-state units a compute unit plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitRole {
    /// Serves all front-door traffic
    Application,
    /// Applies schema migrations before the application is updated
    Migration,
    /// Periodic maintenance, also invoked by the maintenance schedule
    Cleanup,
}

impl UnitRole {
    pub const ALL: [UnitRole; 3] = [UnitRole::Application, UnitRole::Migration, UnitRole::Cleanup];

    pub fn as_str(&self) -> &'static str {
        match self {
            UnitRole::Application => "application",
            UnitRole::Migration => "migration",
            UnitRole::Cleanup => "cleanup",
        }
    }

    /// Entry point inside the shared deployment package
    pub fn handler(&self) -> &'static str {
        match self {
            UnitRole::Application => "lambda.handler",
            UnitRole::Migration => "migrate.handler",
            UnitRole::Cleanup => "cleanup.handler",
        }
    }
}

impl std::fmt::Display for UnitRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UnitRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "application" | "app" => Ok(UnitRole::Application),
            "migration" => Ok(UnitRole::Migration),
            "cleanup" => Ok(UnitRole::Cleanup),
            other => Err(format!("unknown unit role '{}'", other)),
        }
    }
}

/// Network placement of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkPlacement {
    Public,
    Isolated,
    PrivateWithEgress,
}

/// Memory, timeout and network placement of a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceProfile {
    pub memory_mb: u32,
    pub timeout_secs: u64,
    pub network: NetworkPlacement,
}

impl Default for ResourceProfile {
    fn default() -> Self {
        Self {
            memory_mb: 1024,
            timeout_secs: 120,
            network: NetworkPlacement::PrivateWithEgress,
        }
    }
}

/// A deployable function-like execution target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeUnit {
    pub name: String,
    pub role: UnitRole,
    /// Artifact version the unit currently runs, if any was ever deployed
    pub code_version: Option<ArtifactVersion>,
    /// Execution role the unit assumes
    pub execution_role: String,
    pub handler: String,
    pub profile: ResourceProfile,
    pub environment: BTreeMap<String, String>,
}

impl ComputeUnit {
    /// Creates a unit for `role` with the default profile and no code deployed
    pub fn new(name: impl Into<String>, role: UnitRole) -> Self {
        let name = name.into();
        Self {
            execution_role: format!("{}ExecutionRole", name),
            name,
            role,
            code_version: None,
            handler: role.handler().to_string(),
            profile: ResourceProfile::default(),
            environment: BTreeMap::new(),
        }
    }
}

/// Outcome of a code update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ack {
    /// The unit now points at the new version
    Updated { previous: Option<ArtifactVersion> },
    /// The unit already pointed at the requested version
    Unchanged,
}

/// Result of a synchronous unit invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationResult {
    pub status_code: u16,
    pub payload: serde_json::Value,
    /// Set when the unit itself reported an application-level error
    pub function_error: Option<String>,
}

impl InvocationResult {
    pub fn ok(payload: serde_json::Value) -> Self {
        Self {
            status_code: 200,
            payload,
            function_error: None,
        }
    }

    pub fn function_error(message: impl Into<String>) -> Self {
        Self {
            status_code: 200,
            payload: serde_json::Value::Null,
            function_error: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.function_error.is_none() && (200..300).contains(&self.status_code)
    }
}
