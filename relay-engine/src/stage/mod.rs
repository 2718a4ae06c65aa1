//! Release stages
//!
//! Each stage authorizes its principal against the permission model before
//! touching a collaborator, and reports failures with the stage error
//! taxonomy. Stages never retry; the scheduler decides what happens next.

mod build;
mod fetch;
mod invoke;
mod update_code;

pub use build::BuildStage;
pub use fetch::FetchStage;
pub use invoke::MigrationStage;
pub use update_code::CodeUpdateStage;
