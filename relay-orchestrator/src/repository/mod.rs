//! Repository Module
//!
//! Data access layer for the orchestrator. Implements the engine's storage
//! traits on top of Postgres.

pub mod run;

pub use run::PgRunRepository;
