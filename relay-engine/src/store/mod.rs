//! Artifact store
//!
//! Durable, versioned binary storage keyed by logical name. A successful
//! `put` must be readable by any subsequent `get` (read-after-write).

mod fs;
mod memory;

pub use fs::FsArtifactStore;
pub use memory::InMemoryArtifactStore;

use async_trait::async_trait;
use relay_core::domain::artifact::ArtifactVersion;
use thiserror::Error;

/// Errors returned by artifact stores
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("artifact {name}@{version} not found")]
    NotFound {
        name: String,
        version: ArtifactVersion,
    },

    #[error("invalid artifact key '{0}'")]
    InvalidKey(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Versioned artifact storage
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Stores a new version of `name` and returns its version
    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<ArtifactVersion, StoreError>;

    /// Reads one version of `name`
    async fn get(&self, name: &str, version: &ArtifactVersion) -> Result<Vec<u8>, StoreError>;
}

/// Rejects keys that could escape a store's namespace
fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty()
        || key == "."
        || key == ".."
        || key.starts_with('.')
        || key.contains(['/', '\\'])
    {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Version label for the `n`th stored version (1-based)
fn version_label(n: u64) -> ArtifactVersion {
    ArtifactVersion::new(format!("v{}", n))
}
