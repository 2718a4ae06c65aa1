//! Pipeline run domain types
//!
//! A pipeline run is one end-to-end release: a fixed, linear sequence of
//! stages sharing one source snapshot and one artifact. Each stage only
//! starts once its predecessor succeeded; the first failure ends the run.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::artifact::{Artifact, ArtifactVersion};
use crate::domain::grant::Principal;
use crate::domain::log::LogEntry;
use crate::domain::source::{SourceSnapshot, Trigger};
use crate::domain::unit::{Ack, InvocationResult, UnitRole};

/// Identity of a release stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageId {
    Fetch,
    Build,
    UpdateCode(UnitRole),
    InvokeMigration,
}

impl StageId {
    /// The fixed release order
    pub const SEQUENCE: [StageId; 6] = [
        StageId::Fetch,
        StageId::Build,
        StageId::UpdateCode(UnitRole::Migration),
        StageId::InvokeMigration,
        StageId::UpdateCode(UnitRole::Application),
        StageId::UpdateCode(UnitRole::Cleanup),
    ];

    /// Position of this stage in [`StageId::SEQUENCE`]
    pub fn position(&self) -> usize {
        Self::SEQUENCE
            .iter()
            .position(|stage| stage == self)
            .unwrap_or(Self::SEQUENCE.len())
    }

    /// The stage that runs after this one, if any
    pub fn successor(&self) -> Option<StageId> {
        Self::SEQUENCE.get(self.position() + 1).copied()
    }

    /// Identity the stage acts as when touching shared resources
    pub fn principal(&self) -> Principal {
        match self {
            StageId::Fetch | StageId::InvokeMigration => Principal::PipelineRole,
            StageId::Build => Principal::BuildProject,
            StageId::UpdateCode(role) => Principal::CodeDeployer(*role),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            StageId::Fetch => "Fetch_Code",
            StageId::Build => "Build_Code",
            StageId::UpdateCode(UnitRole::Migration) => "Upload_Migration_Code",
            StageId::InvokeMigration => "Run_Migrations",
            StageId::UpdateCode(UnitRole::Application) => "Upload_App_Code",
            StageId::UpdateCode(UnitRole::Cleanup) => "Upload_Clean_Up_Code",
        }
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Stage execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl StageStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StageStatus::Succeeded | StageStatus::Failed)
    }
}

/// Pipeline run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Succeeded | RunStatus::Failed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Queued => write!(f, "Queued"),
            RunStatus::Running => write!(f, "Running"),
            RunStatus::Succeeded => write!(f, "Succeeded"),
            RunStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Queued" => Ok(RunStatus::Queued),
            "Running" => Ok(RunStatus::Running),
            "Succeeded" => Ok(RunStatus::Succeeded),
            "Failed" => Ok(RunStatus::Failed),
            other => Err(format!("unknown run status '{}'", other)),
        }
    }
}

/// What the scheduler does after a stage reports its status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Start(StageId),
    Finish(RunStatus),
    /// The current stage has not reached a terminal status yet
    Blocked,
}

/// Transition function of the release state machine
///
/// `current` is the stage that last ran (`None` before the first stage) and
/// `last` its status.
pub fn next(current: Option<StageId>, last: StageStatus) -> Transition {
    let Some(stage) = current else {
        return Transition::Start(StageId::SEQUENCE[0]);
    };

    match last {
        StageStatus::Succeeded => match stage.successor() {
            Some(successor) => Transition::Start(successor),
            None => Transition::Finish(RunStatus::Succeeded),
        },
        StageStatus::Failed => Transition::Finish(RunStatus::Failed),
        StageStatus::Pending | StageStatus::Running => Transition::Blocked,
    }
}

/// Output a stage produced on success
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageOutput {
    Snapshot(SourceSnapshot),
    Artifact(Artifact),
    CodeUpdated {
        unit: String,
        version: ArtifactVersion,
        ack: Ack,
    },
    Invocation(InvocationResult),
}

/// Error category of a failed stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    SourceUnavailable,
    BuildFailure,
    UploadFailure,
    PermissionDenied,
    NotFound,
    InvocationFailure,
    Timeout,
    /// The run was interrupted by an orchestrator restart
    Interrupted,
}

/// Identity and error of the stage that ended a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: StageId,
    pub kind: FailureKind,
    pub message: String,
}

impl std::fmt::Display for StageFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed ({:?}): {}", self.stage, self.kind, self.message)
    }
}

/// Execution record of one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRun {
    pub stage: StageId,
    pub status: StageStatus,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub output: Option<StageOutput>,
    pub failure: Option<StageFailure>,
    pub logs: Vec<LogEntry>,
}

impl StageRun {
    fn pending(stage: StageId) -> Self {
        Self {
            stage,
            status: StageStatus::Pending,
            started_at: None,
            completed_at: None,
            output: None,
            failure: None,
            logs: Vec::new(),
        }
    }
}

/// One end-to-end release execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: Uuid,
    pub trigger: Trigger,
    pub status: RunStatus,
    /// One record per stage, in release order
    pub stages: Vec<StageRun>,
    pub snapshot: Option<SourceSnapshot>,
    pub artifact: Option<Artifact>,
    /// Artifact version live on every unit, set once the run succeeded
    pub live_version: Option<ArtifactVersion>,
    pub failure: Option<StageFailure>,
    pub requested_at: chrono::DateTime<chrono::Utc>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl PipelineRun {
    /// Creates a queued run with every stage pending
    pub fn new(trigger: Trigger) -> Self {
        Self {
            id: Uuid::new_v4(),
            trigger,
            status: RunStatus::Queued,
            stages: StageId::SEQUENCE.iter().copied().map(StageRun::pending).collect(),
            snapshot: None,
            artifact: None,
            live_version: None,
            failure: None,
            requested_at: chrono::Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn stage(&self, stage: StageId) -> Option<&StageRun> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    fn stage_mut(&mut self, stage: StageId) -> Option<&mut StageRun> {
        self.stages.iter_mut().find(|s| s.stage == stage)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Marks the run as running
    pub fn start(&mut self) {
        self.status = RunStatus::Running;
        self.started_at = Some(chrono::Utc::now());
    }

    pub fn begin_stage(&mut self, stage: StageId) {
        if let Some(record) = self.stage_mut(stage) {
            record.status = StageStatus::Running;
            record.started_at = Some(chrono::Utc::now());
        }
    }

    /// Records a successful stage and keeps its hand-off output on the run
    pub fn complete_stage(&mut self, stage: StageId, output: StageOutput, logs: Vec<LogEntry>) {
        match &output {
            StageOutput::Snapshot(snapshot) => self.snapshot = Some(snapshot.clone()),
            StageOutput::Artifact(artifact) => self.artifact = Some(artifact.clone()),
            StageOutput::CodeUpdated { .. } | StageOutput::Invocation(_) => {}
        }

        if let Some(record) = self.stage_mut(stage) {
            record.status = StageStatus::Succeeded;
            record.completed_at = Some(chrono::Utc::now());
            record.output = Some(output);
            record.logs.extend(logs);
        }
    }

    pub fn fail_stage(&mut self, failure: StageFailure, logs: Vec<LogEntry>) {
        if let Some(record) = self.stage_mut(failure.stage) {
            record.status = StageStatus::Failed;
            record.completed_at = Some(chrono::Utc::now());
            record.failure = Some(failure.clone());
            record.logs.extend(logs);
        }
        self.failure = Some(failure);
    }

    /// Moves the run to a terminal status
    pub fn finish(&mut self, status: RunStatus) {
        self.status = status;
        self.completed_at = Some(chrono::Utc::now());
        if status == RunStatus::Succeeded {
            self.live_version = self.artifact.as_ref().map(|a| a.version.clone());
        }
    }

    /// Fails a run that was cut short before reaching a terminal status
    ///
    /// The stage that was running (or the first one not yet succeeded) is
    /// recorded as interrupted.
    pub fn interrupt(&mut self, message: impl Into<String>) {
        let stage = self
            .stages
            .iter()
            .find(|s| s.status == StageStatus::Running)
            .or_else(|| self.stages.iter().find(|s| s.status != StageStatus::Succeeded))
            .map_or(StageId::SEQUENCE[0], |s| s.stage);

        self.fail_stage(
            StageFailure {
                stage,
                kind: FailureKind::Interrupted,
                message: message.into(),
            },
            Vec::new(),
        );
        self.finish(RunStatus::Failed);
    }

    /// The stage that was executing when the run ended, if it did not succeed
    pub fn failed_stage(&self) -> Option<StageId> {
        self.failure.as_ref().map(|f| f.stage)
    }

    /// Versions referenced by every code-update stage of this run
    pub fn deployed_versions(&self) -> Vec<(&str, &ArtifactVersion)> {
        self.stages
            .iter()
            .filter_map(|s| match &s.output {
                Some(StageOutput::CodeUpdated { unit, version, .. }) => {
                    Some((unit.as_str(), version))
                }
                _ => None,
            })
            .collect()
    }

    /// All stage logs in release order
    pub fn logs(&self) -> Vec<LogEntry> {
        self.stages.iter().flat_map(|s| s.logs.iter().cloned()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger() -> Trigger {
        Trigger::new("acme", "shop", "main", "abc123")
    }

    #[test]
    fn test_sequence_order() {
        let mut stage = Some(StageId::Fetch);
        let mut seen = Vec::new();
        while let Some(current) = stage {
            seen.push(current);
            stage = current.successor();
        }
        assert_eq!(seen, StageId::SEQUENCE.to_vec());
    }

    #[test]
    fn test_next_starts_with_fetch() {
        assert_eq!(
            next(None, StageStatus::Pending),
            Transition::Start(StageId::Fetch)
        );
    }

    #[test]
    fn test_next_advances_on_success() {
        assert_eq!(
            next(Some(StageId::Build), StageStatus::Succeeded),
            Transition::Start(StageId::UpdateCode(UnitRole::Migration))
        );
        assert_eq!(
            next(Some(StageId::InvokeMigration), StageStatus::Succeeded),
            Transition::Start(StageId::UpdateCode(UnitRole::Application))
        );
        assert_eq!(
            next(
                Some(StageId::UpdateCode(UnitRole::Cleanup)),
                StageStatus::Succeeded
            ),
            Transition::Finish(RunStatus::Succeeded)
        );
    }

    #[test]
    fn test_next_halts_on_failure() {
        for stage in StageId::SEQUENCE {
            assert_eq!(
                next(Some(stage), StageStatus::Failed),
                Transition::Finish(RunStatus::Failed)
            );
        }
    }

    #[test]
    fn test_next_blocks_until_terminal() {
        assert_eq!(next(Some(StageId::Build), StageStatus::Running), Transition::Blocked);
        assert_eq!(next(Some(StageId::Fetch), StageStatus::Pending), Transition::Blocked);
    }

    #[test]
    fn test_stage_principals() {
        assert_eq!(StageId::Build.principal(), Principal::BuildProject);
        assert_eq!(
            StageId::UpdateCode(UnitRole::Cleanup).principal(),
            Principal::CodeDeployer(UnitRole::Cleanup)
        );
        assert_eq!(StageId::InvokeMigration.principal(), Principal::PipelineRole);
    }

    #[test]
    fn test_new_run_is_queued_with_pending_stages() {
        let run = PipelineRun::new(trigger());
        assert_eq!(run.status, RunStatus::Queued);
        assert_eq!(run.stages.len(), StageId::SEQUENCE.len());
        assert!(run.stages.iter().all(|s| s.status == StageStatus::Pending));
    }

    #[test]
    fn test_failure_is_recorded_on_stage_and_run() {
        let mut run = PipelineRun::new(trigger());
        run.start();
        run.begin_stage(StageId::Fetch);
        run.fail_stage(
            StageFailure {
                stage: StageId::Fetch,
                kind: FailureKind::SourceUnavailable,
                message: "branch deleted".to_string(),
            },
            Vec::new(),
        );
        run.finish(RunStatus::Failed);

        assert_eq!(run.failed_stage(), Some(StageId::Fetch));
        assert_eq!(
            run.stage(StageId::Fetch).map(|s| s.status),
            Some(StageStatus::Failed)
        );
        assert_eq!(
            run.stage(StageId::Build).map(|s| s.status),
            Some(StageStatus::Pending)
        );
        assert!(run.live_version.is_none());
    }

    #[test]
    fn test_interrupt_fails_running_stage() {
        let mut run = PipelineRun::new(trigger());
        run.start();
        run.begin_stage(StageId::Fetch);
        run.complete_stage(
            StageId::Fetch,
            StageOutput::Snapshot(SourceSnapshot {
                commit_ref: "abc123".to_string(),
                branch: "main".to_string(),
                workdir: None,
                fetched_at: chrono::Utc::now(),
            }),
            Vec::new(),
        );
        run.begin_stage(StageId::Build);

        run.interrupt("orchestrator restarted");

        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.failed_stage(), Some(StageId::Build));
        assert_eq!(
            run.failure.as_ref().map(|f| f.kind),
            Some(FailureKind::Interrupted)
        );
        assert_eq!(
            run.stage(StageId::Fetch).map(|s| s.status),
            Some(StageStatus::Succeeded)
        );
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            RunStatus::Queued,
            RunStatus::Running,
            RunStatus::Succeeded,
            RunStatus::Failed,
        ] {
            assert_eq!(status.to_string().parse::<RunStatus>(), Ok(status));
        }
    }
}
