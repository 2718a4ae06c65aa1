//! Run repository
//!
//! Storage for pipeline run records. The scheduler writes the whole record
//! after every transition; readers only ever see committed snapshots.
//!
//! The trait lets the orchestrator plug in its database while tests and
//! local runs keep everything in memory.

mod memory;

pub use memory::InMemoryRunRepository;

use async_trait::async_trait;
use relay_core::domain::run::{PipelineRun, RunStatus};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("run {0} not found")]
    NotFound(Uuid),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("run record could not be encoded: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Repository trait for pipeline run records
#[async_trait]
pub trait RunRepository: Send + Sync {
    /// Stores a new run
    async fn insert(&self, run: &PipelineRun) -> Result<(), RepositoryError>;

    /// Replaces the stored record of an existing run
    async fn update(&self, run: &PipelineRun) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PipelineRun>, RepositoryError>;

    /// All runs, newest request first
    async fn list(&self) -> Result<Vec<PipelineRun>, RepositoryError>;

    /// Runs in `status`, oldest request first
    async fn find_by_status(&self, status: RunStatus) -> Result<Vec<PipelineRun>, RepositoryError>;
}
