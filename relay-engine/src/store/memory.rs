//! In-memory artifact store

use async_trait::async_trait;
use relay_core::domain::artifact::ArtifactVersion;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::{ArtifactStore, StoreError, validate_key, version_label};

/// Artifact store backed by a map; versions are `v1`, `v2`, ... per name
#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    objects: Mutex<HashMap<String, Vec<Vec<u8>>>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of versions stored under `name`
    pub fn version_count(&self, name: &str) -> usize {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<ArtifactVersion, StoreError> {
        validate_key(name)?;

        let mut objects = self.objects.lock().unwrap_or_else(PoisonError::into_inner);
        let versions = objects.entry(name.to_string()).or_default();
        versions.push(bytes);

        Ok(version_label(versions.len() as u64))
    }

    async fn get(&self, name: &str, version: &ArtifactVersion) -> Result<Vec<u8>, StoreError> {
        let not_found = || StoreError::NotFound {
            name: name.to_string(),
            version: version.clone(),
        };

        let index = version
            .as_str()
            .strip_prefix('v')
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .ok_or_else(not_found)?;

        let objects = self.objects.lock().unwrap_or_else(PoisonError::into_inner);
        objects
            .get(name)
            .and_then(|versions| versions.get(index - 1))
            .cloned()
            .ok_or_else(not_found)
    }
}
