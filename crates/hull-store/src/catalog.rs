//! Persistent artifact catalog backed by a JSON file.
//!
//! The file holds a map of artifact id to record. The scanning subsystem
//! only ever calls the merge-upsert form mid-batch, so a crash loses at
//! most the artifacts still in flight; everything already upserted is on
//! disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use hull_core::Artifact;

use crate::error::{Result, StoreError};

/// Narrow persistence interface the scanning subsystem depends on.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Write artifacts to the store.
    ///
    /// With `merge = true`, only the given ids are replaced and the rest of
    /// the catalog is left untouched. With `merge = false`, the store is
    /// rewritten to contain exactly the given artifacts.
    async fn upsert(&self, artifacts: &[Artifact], merge: bool) -> Result<()>;

    /// Load every artifact in the store.
    async fn load_all(&self) -> Result<Vec<Artifact>>;
}

/// File-backed catalog store.
///
/// Writes are serialized through an internal lock; each upsert is a full
/// read-modify-write of the file, which is acceptable at catalog scale
/// (thousands of records, not millions).
pub struct JsonCatalogStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonCatalogStore {
    /// Create a store over the given file path.
    ///
    /// The file is created on first write; a missing file reads as an
    /// empty catalog.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, Artifact>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path).map_err(|e| StoreError::Io {
            path: self.path.display().to_string(),
            source: e,
        })?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
            path: self.path.display().to_string(),
            source: e,
        })
    }

    fn write_map(&self, map: &BTreeMap<String, Artifact>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        let content = serde_json::to_string_pretty(map)?;
        std::fs::write(&self.path, content).map_err(|e| StoreError::Io {
            path: self.path.display().to_string(),
            source: e,
        })
    }
}

#[async_trait]
impl CatalogStore for JsonCatalogStore {
    async fn upsert(&self, artifacts: &[Artifact], merge: bool) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut map = if merge {
            self.read_map()?
        } else {
            BTreeMap::new()
        };
        for artifact in artifacts {
            map.insert(artifact.id.clone(), artifact.clone());
        }
        self.write_map(&map)?;
        debug!(count = artifacts.len(), merge, "catalog upsert");
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<Artifact>> {
        let map = self.read_map()?;
        Ok(map.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hull_core::SourcePlatform;

    fn store_in(dir: &tempfile::TempDir) -> JsonCatalogStore {
        JsonCatalogStore::new(dir.path().join("catalog.json"))
    }

    #[tokio::test]
    async fn load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn merge_upsert_preserves_other_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let a = Artifact::new("docker:library/nginx", SourcePlatform::DockerHub);
        let b = Artifact::new("docker:library/redis", SourcePlatform::DockerHub);
        store.upsert(&[a, b], true).await.unwrap();

        let mut updated = Artifact::new("docker:library/nginx", SourcePlatform::DockerHub);
        updated.selected_tag = Some("1.27".into());
        store.upsert(&[updated], true).await.unwrap();

        let all = store.load_all().await.unwrap();
        assert_eq!(all.len(), 2);
        let nginx = all.iter().find(|a| a.id.ends_with("nginx")).unwrap();
        assert_eq!(nginx.selected_tag.as_deref(), Some("1.27"));
    }

    #[tokio::test]
    async fn replace_upsert_drops_other_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let a = Artifact::new("docker:library/nginx", SourcePlatform::DockerHub);
        let b = Artifact::new("docker:library/redis", SourcePlatform::DockerHub);
        store.upsert(&[a.clone(), b], true).await.unwrap();
        store.upsert(&[a], false).await.unwrap();

        let all = store.load_all().await.unwrap();
        assert_eq!(all.len(), 1);
    }
}
