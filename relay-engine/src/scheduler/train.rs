//! Release train
//!
//! Accepted triggers become queued runs and wait in a FIFO channel. A single
//! worker task takes them one at a time and hands them to the scheduler, so
//! runs execute strictly in arrival order and never overlap.

use relay_core::domain::run::{PipelineRun, RunStatus};
use relay_core::domain::source::Trigger;
use relay_core::dto::run::TriggerAccepted;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::PipelineScheduler;
use crate::repository::RepositoryError;

#[derive(Debug, Error)]
pub enum TrainError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("release train is no longer running")]
    Stopped,
}

/// Handle for submitting runs to the release lane
pub struct ReleaseTrain {
    scheduler: Arc<PipelineScheduler>,
    sender: mpsc::UnboundedSender<PipelineRun>,
    /// Runs accepted and not finished yet
    depth: Arc<AtomicUsize>,
}

impl ReleaseTrain {
    /// Spawns the worker task and returns the train with the worker handle
    ///
    /// The worker stops once every `ReleaseTrain` handle is dropped and the
    /// queue is drained.
    pub fn start(scheduler: Arc<PipelineScheduler>) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::unbounded_channel::<PipelineRun>();
        let depth = Arc::new(AtomicUsize::new(0));

        let worker = {
            let scheduler = Arc::clone(&scheduler);
            let depth = Arc::clone(&depth);
            tokio::spawn(async move {
                info!("Release train started");
                while let Some(run) = receiver.recv().await {
                    let finished = scheduler.execute(run).await;
                    depth.fetch_sub(1, Ordering::SeqCst);
                    debug!("Run {} left the lane as {}", finished.id, finished.status);
                }
                info!("Release train stopped");
            })
        };

        (
            Self {
                scheduler,
                sender,
                depth,
            },
            worker,
        )
    }

    /// Records a queued run for `trigger` and puts it at the back of the lane
    pub async fn submit(&self, trigger: Trigger) -> Result<TriggerAccepted, TrainError> {
        let run = PipelineRun::new(trigger);
        self.scheduler.runs().insert(&run).await?;

        info!("Accepted run {} for {}", run.id, run.trigger);
        self.enqueue(run)
    }

    /// Number of runs accepted and not finished (including a running one)
    pub fn pending(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    /// Restores the lane after a restart
    ///
    /// Runs left `Running` can not be resumed safely and are failed as
    /// interrupted; `Queued` runs are re-enqueued oldest first. Returns the
    /// number of re-enqueued runs.
    pub async fn recover(&self) -> Result<usize, TrainError> {
        let runs = self.scheduler.runs();

        for mut run in runs.find_by_status(RunStatus::Running).await? {
            warn!("Run {} was interrupted by a restart", run.id);
            run.interrupt("orchestrator restarted while the run was active");
            runs.update(&run).await?;
        }

        let queued = runs.find_by_status(RunStatus::Queued).await?;
        let count = queued.len();
        for run in queued {
            self.enqueue(run)?;
        }

        if count > 0 {
            info!("Re-enqueued {} queued run(s)", count);
        }
        Ok(count)
    }

    fn enqueue(&self, run: PipelineRun) -> Result<TriggerAccepted, TrainError> {
        let runs_ahead = self.depth.fetch_add(1, Ordering::SeqCst);
        let accepted = TriggerAccepted {
            run_id: run.id,
            status: run.status,
            runs_ahead,
        };

        if self.sender.send(run).is_err() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            return Err(TrainError::Stopped);
        }

        Ok(accepted)
    }
}
