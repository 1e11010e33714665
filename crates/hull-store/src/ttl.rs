//! Generic categorized TTL key-value store.
//!
//! Entries expire after a per-entry TTL and are pruned lazily when read.
//! The file-backed variant survives process restarts, which matters for
//! the scan-failure cache: a permanently broken image cached in one run
//! must still be skipped by the next.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{Result, StoreError};

/// A stored value with its expiry bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtlEntry {
    /// Opaque value payload (callers serialize their own structure)
    pub value: String,
    /// When the entry was stored
    pub stored_at: DateTime<Utc>,
    /// Lifetime in seconds from `stored_at`
    pub ttl_secs: u64,
}

impl TtlEntry {
    /// Returns true if the entry has outlived its TTL at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let age = now - self.stored_at;
        age.num_seconds() >= 0 && age.num_seconds() as u64 >= self.ttl_secs
    }
}

/// Generic TTL cache interface, keyed by `(category, key)`.
#[async_trait]
pub trait TtlStore: Send + Sync {
    /// Store a value under a category with the given lifetime.
    async fn put(&self, key: &str, value: &str, category: &str, ttl: Duration) -> Result<()>;

    /// Fetch a live entry; expired entries are pruned and read as absent.
    async fn get(&self, key: &str, category: &str) -> Result<Option<TtlEntry>>;

    /// Remove an entry regardless of expiry.
    async fn delete(&self, key: &str, category: &str) -> Result<()>;
}

type EntryMap = HashMap<String, HashMap<String, TtlEntry>>;

/// In-memory TTL store for tests and single-run use.
#[derive(Default)]
pub struct MemoryTtlStore {
    entries: Mutex<EntryMap>,
}

impl MemoryTtlStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TtlStore for MemoryTtlStore {
    async fn put(&self, key: &str, value: &str, category: &str, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.entry(category.to_string()).or_default().insert(
            key.to_string(),
            TtlEntry {
                value: value.to_string(),
                stored_at: Utc::now(),
                ttl_secs: ttl.as_secs(),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str, category: &str) -> Result<Option<TtlEntry>> {
        let mut entries = self.entries.lock().await;
        let Some(bucket) = entries.get_mut(category) else {
            return Ok(None);
        };
        if bucket.get(key).is_some_and(|e| e.is_expired(Utc::now())) {
            bucket.remove(key);
            return Ok(None);
        }
        Ok(bucket.get(key).cloned())
    }

    async fn delete(&self, key: &str, category: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        if let Some(bucket) = entries.get_mut(category) {
            bucket.remove(key);
        }
        Ok(())
    }
}

/// File-backed TTL store: one JSON file holding every category.
pub struct JsonTtlStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonTtlStore {
    /// Create a store over the given file path; a missing file reads empty.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn read_entries(&self) -> Result<EntryMap> {
        if !self.path.exists() {
            return Ok(EntryMap::new());
        }
        let content = std::fs::read_to_string(&self.path).map_err(|e| StoreError::Io {
            path: self.path.display().to_string(),
            source: e,
        })?;
        if content.trim().is_empty() {
            return Ok(EntryMap::new());
        }
        serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
            path: self.path.display().to_string(),
            source: e,
        })
    }

    fn write_entries(&self, entries: &EntryMap) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        let content = serde_json::to_string(entries)?;
        std::fs::write(&self.path, content).map_err(|e| StoreError::Io {
            path: self.path.display().to_string(),
            source: e,
        })
    }
}

#[async_trait]
impl TtlStore for JsonTtlStore {
    async fn put(&self, key: &str, value: &str, category: &str, ttl: Duration) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_entries()?;
        entries.entry(category.to_string()).or_default().insert(
            key.to_string(),
            TtlEntry {
                value: value.to_string(),
                stored_at: Utc::now(),
                ttl_secs: ttl.as_secs(),
            },
        );
        self.write_entries(&entries)
    }

    async fn get(&self, key: &str, category: &str) -> Result<Option<TtlEntry>> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_entries()?;
        let Some(bucket) = entries.get_mut(category) else {
            return Ok(None);
        };
        if bucket.get(key).is_some_and(|e| e.is_expired(Utc::now())) {
            bucket.remove(key);
            debug!(key, category, "pruned expired ttl entry");
            self.write_entries(&entries)?;
            return Ok(None);
        }
        Ok(entries.get(category).and_then(|b| b.get(key)).cloned())
    }

    async fn delete(&self, key: &str, category: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_entries()?;
        let removed = entries
            .get_mut(category)
            .and_then(|bucket| bucket.remove(key))
            .is_some();
        if removed {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_put_get_delete() {
        let store = MemoryTtlStore::new();
        store
            .put("k", "v", "cat", Duration::from_secs(60))
            .await
            .unwrap();

        let entry = store.get("k", "cat").await.unwrap().unwrap();
        assert_eq!(entry.value, "v");

        store.delete("k", "cat").await.unwrap();
        assert!(store.get("k", "cat").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn zero_ttl_reads_as_absent() {
        let store = MemoryTtlStore::new();
        store.put("k", "v", "cat", Duration::ZERO).await.unwrap();
        assert!(store.get("k", "cat").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn categories_are_disjoint() {
        let store = MemoryTtlStore::new();
        store
            .put("k", "v1", "a", Duration::from_secs(60))
            .await
            .unwrap();
        store
            .put("k", "v2", "b", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(store.get("k", "a").await.unwrap().unwrap().value, "v1");
        assert_eq!(store.get("k", "b").await.unwrap().unwrap().value, "v2");
    }

    #[tokio::test]
    async fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ttl.json");

        let store = JsonTtlStore::new(&path);
        store
            .put("k", "v", "cat", Duration::from_secs(3600))
            .await
            .unwrap();
        drop(store);

        let reopened = JsonTtlStore::new(&path);
        let entry = reopened.get("k", "cat").await.unwrap().unwrap();
        assert_eq!(entry.value, "v");
    }

    #[test]
    fn expiry_math() {
        let entry = TtlEntry {
            value: String::new(),
            stored_at: Utc::now() - chrono::Duration::seconds(120),
            ttl_secs: 60,
        };
        assert!(entry.is_expired(Utc::now()));

        let fresh = TtlEntry {
            value: String::new(),
            stored_at: Utc::now(),
            ttl_secs: 60,
        };
        assert!(!fresh.is_expired(Utc::now()));
    }
}
