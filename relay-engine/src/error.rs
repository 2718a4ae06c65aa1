//! Stage error taxonomy
//!
//! Any stage error is fatal to the current pipeline run.

use relay_core::domain::grant::{Action, Principal, Resource};
use relay_core::domain::run::{FailureKind, StageFailure, StageId};
use std::time::Duration;
use thiserror::Error;

/// Errors a release stage can report
#[derive(Debug, Error)]
pub enum StageError {
    /// The upstream source reference could not be resolved
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// The build procedure exited unsuccessfully
    #[error("build failed: {exit_reason}")]
    BuildFailure { exit_reason: String },

    /// The artifact (or a unit's code pointer) could not be durably written
    #[error("upload failed: {0}")]
    UploadFailure(String),

    /// The acting principal holds no grant for the action
    #[error("{principal} is not permitted to perform {action} on {resource}")]
    PermissionDenied {
        principal: Principal,
        resource: Resource,
        action: Action,
    },

    /// A compute unit or stage input does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The invoked unit reported an error
    #[error("invocation failed: {cause}")]
    InvocationFailure { cause: String },

    /// The invoked unit did not complete within the bound
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl StageError {
    pub fn kind(&self) -> FailureKind {
        match self {
            StageError::SourceUnavailable(_) => FailureKind::SourceUnavailable,
            StageError::BuildFailure { .. } => FailureKind::BuildFailure,
            StageError::UploadFailure(_) => FailureKind::UploadFailure,
            StageError::PermissionDenied { .. } => FailureKind::PermissionDenied,
            StageError::NotFound(_) => FailureKind::NotFound,
            StageError::InvocationFailure { .. } => FailureKind::InvocationFailure,
            StageError::Timeout(_) => FailureKind::Timeout,
        }
    }

    /// Converts the error into the failure record of `stage`
    pub fn into_failure(self, stage: StageId) -> StageFailure {
        StageFailure {
            stage,
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::domain::unit::UnitRole;

    #[test]
    fn test_failure_carries_kind_and_message() {
        let failure = StageError::InvocationFailure {
            cause: "schema conflict".to_string(),
        }
        .into_failure(StageId::InvokeMigration);

        assert_eq!(failure.stage, StageId::InvokeMigration);
        assert_eq!(failure.kind, FailureKind::InvocationFailure);
        assert!(failure.message.contains("schema conflict"));
    }

    #[test]
    fn test_permission_denied_message() {
        let err = StageError::PermissionDenied {
            principal: Principal::CodeDeployer(UnitRole::Application),
            resource: Resource::Unit(UnitRole::Migration),
            action: Action::UpdateFunctionCode,
        };
        assert_eq!(
            err.to_string(),
            "code-deployer:application is not permitted to perform lambda:UpdateFunctionCode on unit:migration"
        );
    }
}
