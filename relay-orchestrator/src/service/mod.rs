//! Service Module
//!
//! Business logic layer for the orchestrator.
//! Services sit between the HTTP handlers and the release engine.

pub mod grant;
pub mod run;
pub mod unit;
pub mod webhook;

// Re-export for convenience
pub use grant as grant_service;
pub use run as run_service;
pub use unit as unit_service;
pub use webhook as webhook_service;
