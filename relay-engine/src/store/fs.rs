//! Filesystem artifact store
//!
//! Layout: `<root>/<name>/<version>`. Each version is written to a temporary
//! file, synced and then renamed into place, so a returned version is always
//! complete on disk.

use async_trait::async_trait;
use relay_core::domain::artifact::ArtifactVersion;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use super::{ArtifactStore, StoreError, validate_key, version_label};

/// Durable artifact store rooted at a directory
#[derive(Debug)]
pub struct FsArtifactStore {
    root: PathBuf,
    /// Serializes version allocation
    write_lock: Mutex<()>,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Highest version number present in `dir`
    async fn latest_version(dir: &Path) -> Result<u64, StoreError> {
        let mut latest = 0;
        let mut entries = tokio::fs::read_dir(dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let n = file_name
                .to_str()
                .and_then(|name| name.strip_prefix('v'))
                .and_then(|n| n.parse::<u64>().ok());
            if let Some(n) = n {
                latest = latest.max(n);
            }
        }

        Ok(latest)
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<ArtifactVersion, StoreError> {
        validate_key(name)?;

        let _guard = self.write_lock.lock().await;

        let dir = self.root.join(name);
        tokio::fs::create_dir_all(&dir).await?;

        let version = version_label(Self::latest_version(&dir).await? + 1);
        let tmp_path = dir.join(format!(".{}.tmp", version));
        let final_path = dir.join(version.as_str());

        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp_path, &final_path).await?;

        debug!(
            "Stored {} bytes as {}@{} in {}",
            bytes.len(),
            name,
            version,
            self.root.display()
        );

        Ok(version)
    }

    async fn get(&self, name: &str, version: &ArtifactVersion) -> Result<Vec<u8>, StoreError> {
        validate_key(name)?;
        validate_key(version.as_str())?;

        match tokio::fs::read(self.root.join(name).join(version.as_str())).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound {
                name: name.to_string(),
                version: version.clone(),
            }),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}
