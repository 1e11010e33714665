//! Scan-failure cache: a domain facade over the generic TTL store.
//!
//! Consulted before every scan attempt; a live entry skips the scanner
//! entirely and counts as "skipped" in the batch result.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use hull_store::TtlStore;

use crate::classify::FailureClass;
use crate::error::Result;

/// Category under which scan failures live in the TTL store.
const CATEGORY: &str = "scan_failure";

/// What we remember about a failed scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureInfo {
    /// Truncated error text from the failing attempt
    pub error: String,
    /// Classification that chose the TTL
    pub class: FailureClass,
    /// When the failure was recorded
    pub recorded_at: DateTime<Utc>,
}

/// TTL-backed store of known-failing artifacts.
pub struct ScanFailureCache {
    store: Arc<dyn TtlStore>,
}

impl ScanFailureCache {
    /// Create a cache over the given TTL store.
    #[must_use]
    pub fn new(store: Arc<dyn TtlStore>) -> Self {
        Self { store }
    }

    /// Record a failure with the given TTL.
    pub async fn mark_failed(
        &self,
        artifact_id: &str,
        error: &str,
        class: FailureClass,
        ttl: Duration,
    ) -> Result<()> {
        let info = FailureInfo {
            error: error.to_string(),
            class,
            recorded_at: Utc::now(),
        };
        let payload = serde_json::to_string(&info).map_err(hull_store::StoreError::from)?;
        self.store.put(artifact_id, &payload, CATEGORY, ttl).await?;
        debug!(artifact_id, %class, ttl_secs = ttl.as_secs(), "cached scan failure");
        Ok(())
    }

    /// Returns true if the artifact has a live failure entry.
    pub async fn is_failed(&self, artifact_id: &str) -> Result<bool> {
        Ok(self.store.get(artifact_id, CATEGORY).await?.is_some())
    }

    /// Fetch the recorded failure, if any.
    ///
    /// An entry whose payload no longer parses is treated as absent; the
    /// next failure overwrites it.
    pub async fn failure_info(&self, artifact_id: &str) -> Result<Option<FailureInfo>> {
        let Some(entry) = self.store.get(artifact_id, CATEGORY).await? else {
            return Ok(None);
        };
        Ok(serde_json::from_str(&entry.value).ok())
    }

    /// Drop a failure entry, making the artifact eligible again.
    pub async fn clear_failure(&self, artifact_id: &str) -> Result<()> {
        self.store.delete(artifact_id, CATEGORY).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hull_store::MemoryTtlStore;

    fn cache() -> ScanFailureCache {
        ScanFailureCache::new(Arc::new(MemoryTtlStore::new()))
    }

    #[tokio::test]
    async fn mark_and_query() {
        let cache = cache();
        cache
            .mark_failed(
                "docker:library/ghost",
                "manifest unknown",
                FailureClass::Permanent,
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        assert!(cache.is_failed("docker:library/ghost").await.unwrap());
        let info = cache
            .failure_info("docker:library/ghost")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(info.class, FailureClass::Permanent);
        assert_eq!(info.error, "manifest unknown");
    }

    #[tokio::test]
    async fn unknown_artifact_is_not_failed() {
        let cache = cache();
        assert!(!cache.is_failed("docker:library/nginx").await.unwrap());
        assert!(cache
            .failure_info("docker:library/nginx")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn clear_makes_eligible_again() {
        let cache = cache();
        cache
            .mark_failed(
                "docker:a/b",
                "timeout",
                FailureClass::Transient,
                Duration::from_secs(60),
            )
            .await
            .unwrap();
        cache.clear_failure("docker:a/b").await.unwrap();
        assert!(!cache.is_failed("docker:a/b").await.unwrap());
    }

    #[tokio::test]
    async fn expired_entry_reads_as_absent() {
        let cache = cache();
        cache
            .mark_failed("docker:a/b", "timeout", FailureClass::Transient, Duration::ZERO)
            .await
            .unwrap();
        assert!(!cache.is_failed("docker:a/b").await.unwrap());
    }
}
