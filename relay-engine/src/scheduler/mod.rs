//! Scheduler layer
//!
//! `PipelineScheduler` drives one run through the release sequence using the
//! transition function from the core crate. `ReleaseTrain` feeds it triggers
//! one at a time, in arrival order.

mod pipeline;
mod train;

pub use pipeline::{PipelineScheduler, SchedulerDeps};
pub use train::{ReleaseTrain, TrainError};
