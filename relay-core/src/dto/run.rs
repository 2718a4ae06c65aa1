//! Pipeline run DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::artifact::ArtifactVersion;
use crate::domain::log::LogEntry;
use crate::domain::run::{PipelineRun, RunStatus, StageId, StageStatus};

/// Lightweight run summary for listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: Uuid,
    pub status: RunStatus,
    pub branch: String,
    pub commit_ref: String,
    pub failed_stage: Option<StageId>,
    pub live_version: Option<ArtifactVersion>,
    pub requested_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<PipelineRun> for RunSummary {
    fn from(run: PipelineRun) -> Self {
        Self {
            id: run.id,
            status: run.status,
            failed_stage: run.failed_stage(),
            branch: run.trigger.branch,
            commit_ref: run.trigger.commit_ref,
            live_version: run.live_version,
            requested_at: run.requested_at,
            completed_at: run.completed_at,
        }
    }
}

/// Response to an accepted trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerAccepted {
    pub run_id: Uuid,
    pub status: RunStatus,
    /// Runs ahead of this one in the release lane, including a running one
    pub runs_ahead: usize,
}

/// Log entries captured by one stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageLogs {
    pub stage: StageId,
    pub status: StageStatus,
    pub entries: Vec<LogEntry>,
}

impl StageLogs {
    /// Per-stage logs of `run` in release order
    pub fn for_run(run: &PipelineRun) -> Vec<StageLogs> {
        run.stages
            .iter()
            .map(|s| StageLogs {
                stage: s.stage,
                status: s.status,
                entries: s.logs.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::source::Trigger;

    #[test]
    fn test_run_summary_conversion() {
        let run = PipelineRun::new(Trigger::new("acme", "shop", "main", "abc123"));
        let id = run.id;

        let summary: RunSummary = run.into();
        assert_eq!(summary.id, id);
        assert_eq!(summary.status, RunStatus::Queued);
        assert_eq!(summary.commit_ref, "abc123");
        assert!(summary.failed_stage.is_none());
    }
}
