//! Trigger and source snapshot types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Source-control event that starts a release
///
/// The engine treats it as an opaque token handed to the source fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub commit_ref: String,
}

impl Trigger {
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        branch: impl Into<String>,
        commit_ref: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            branch: branch.into(),
            commit_ref: commit_ref.into(),
        }
    }

    /// Clone URL of the upstream repository
    pub fn source_url(&self) -> String {
        format!("https://github.com/{}/{}.git", self.owner, self.repo)
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}@{} ({})",
            self.owner, self.repo, self.branch, self.commit_ref
        )
    }
}

/// Immutable point-in-time reference to the application source
///
/// Produced once per trigger and consumed once by the build stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSnapshot {
    pub commit_ref: String,
    pub branch: String,
    /// Checked-out working tree, when the fetcher materializes one
    pub workdir: Option<PathBuf>,
    pub fetched_at: chrono::DateTime<chrono::Utc>,
}
