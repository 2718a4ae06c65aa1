//! Compute unit registry
//!
//! Maps logical function names to deployable units and exposes the two
//! mutations a release needs: repointing a unit's code and invoking it.

mod http;
mod memory;

pub use http::HttpComputeRegistry;
pub use memory::{FnHandler, InMemoryComputeRegistry, UnitHandler};

use async_trait::async_trait;
use relay_core::domain::artifact::ArtifactRef;
use relay_core::domain::unit::{Ack, ComputeUnit, InvocationResult};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Errors returned by compute registries
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("compute unit '{0}' not found")]
    NotFound(String),

    #[error("registry rejected request: {0}")]
    Rejected(String),

    #[error("registry transport error: {0}")]
    Transport(String),
}

/// Registry of deployable compute units
#[async_trait]
pub trait ComputeRegistry: Send + Sync {
    /// Looks up a unit by name
    async fn get_unit(&self, name: &str) -> Result<ComputeUnit, RegistryError>;

    /// Atomically repoints a unit's code at `artifact`
    ///
    /// Applying the same artifact twice succeeds with [`Ack::Unchanged`].
    async fn update_unit_code(&self, name: &str, artifact: &ArtifactRef)
    -> Result<Ack, RegistryError>;

    /// Synchronously invokes a unit
    async fn invoke_unit(
        &self,
        name: &str,
        payload: JsonValue,
    ) -> Result<InvocationResult, RegistryError>;
}
