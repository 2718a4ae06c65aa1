//! In-memory run repository

use async_trait::async_trait;
use relay_core::domain::run::{PipelineRun, RunStatus};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

use super::{RepositoryError, RunRepository};

#[derive(Debug, Default)]
pub struct InMemoryRunRepository {
    runs: RwLock<HashMap<Uuid, PipelineRun>>,
}

impl InMemoryRunRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted(&self, filter: impl Fn(&PipelineRun) -> bool) -> Vec<PipelineRun> {
        let runs = self.runs.read().unwrap_or_else(PoisonError::into_inner);
        let mut matching: Vec<PipelineRun> = runs.values().filter(|r| filter(r)).cloned().collect();
        matching.sort_by_key(|r| r.requested_at);
        matching
    }
}

#[async_trait]
impl RunRepository for InMemoryRunRepository {
    async fn insert(&self, run: &PipelineRun) -> Result<(), RepositoryError> {
        self.runs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(run.id, run.clone());
        Ok(())
    }

    async fn update(&self, run: &PipelineRun) -> Result<(), RepositoryError> {
        let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
        match runs.get_mut(&run.id) {
            Some(stored) => {
                *stored = run.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound(run.id)),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PipelineRun>, RepositoryError> {
        Ok(self
            .runs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<PipelineRun>, RepositoryError> {
        let mut runs = self.sorted(|_| true);
        runs.reverse();
        Ok(runs)
    }

    async fn find_by_status(&self, status: RunStatus) -> Result<Vec<PipelineRun>, RepositoryError> {
        Ok(self.sorted(|r| r.status == status))
    }
}
