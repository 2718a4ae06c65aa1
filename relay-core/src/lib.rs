//! Relay Core
//!
//! Core types and abstractions for the Relay release train.
//!
//! This crate contains:
//! - Domain types: Core business entities (PipelineRun, ComputeUnit, Grant, etc.)
//! - DTOs: Data transfer objects for the orchestrator API

pub mod domain;
pub mod dto;
