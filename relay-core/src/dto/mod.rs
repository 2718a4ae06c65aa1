//! Data Transfer Objects for the orchestrator API
//!
//! DTOs are lightweight representations of domain entities used by list
//! endpoints and trigger responses.

pub mod run;
