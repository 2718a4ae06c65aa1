//! Relay Engine
//!
//! The release train: a fixed, fail-fast sequence of stages that fetches
//! source, builds one deployment package and repoints every compute unit at
//! it, running the database migration in between.
//!
//! Architecture:
//! - Collaborators: artifact store, compute registry, secrets, source fetcher
//!   and build procedure, each behind a trait with local adapters
//! - Permissions: one declarative grant table expanded at provisioning time
//! - Stages: the per-stage contracts, each authorizing before it acts
//! - Scheduler: the transition loop and the single-lane release train
//! - Repository: run history storage

pub mod build;
pub mod config;
pub mod context;
pub mod error;
pub mod maintenance;
pub mod permissions;
pub mod registry;
pub mod repository;
pub mod scheduler;
pub mod secrets;
pub mod source;
pub mod stage;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{PipelineSettings, ReleaseTargets};
pub use error::StageError;
pub use maintenance::MaintenanceSchedule;
pub use permissions::{PermissionModel, Topology};
pub use scheduler::{PipelineScheduler, ReleaseTrain, SchedulerDeps, TrainError};
