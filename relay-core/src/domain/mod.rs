//! Core domain types
//!
//! This module contains the core domain structures used across Relay services.
//! They are shared between the engine (executes releases), the orchestrator
//! (persists and serves them) and the client/CLI (displays them).

pub mod artifact;
pub mod grant;
pub mod log;
pub mod run;
pub mod source;
pub mod unit;
