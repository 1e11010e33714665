//! Batch scan orchestration.
//!
//! Drives many concurrently-suspending scan tasks under a counting
//! semaphore, consults the failure cache before every attempt, persists
//! each success immediately (merge write, so a crash loses only in-flight
//! work), and assembles an aggregate batch result once every task resolves.
//!
//! The external scanner's on-disk database cache is unsafe under unbounded
//! concurrent writers, so each batch gets a fresh temporary cache directory
//! that is removed when the batch ends, whatever the outcome.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use hull_core::{Artifact, ScanStatus, SecurityState};
use hull_store::CatalogStore;

use crate::cache::ScanFailureCache;
use crate::classify::{cache_ttl, classify, FailureClass};
use crate::error::{Result, ScanError};
use crate::resolve::resolve;
use crate::runner::CommandRunner;
use crate::scanner::{ScannerConfig, TrivyScanner};

/// Progress callback: `(completed, total)` after every terminal outcome.
/// Ordering across tasks is unspecified; only the final count is
/// authoritative.
pub type ProgressFn = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Upper bound on in-flight scans
    pub concurrency: usize,
    /// Maximum age of a prior scan before it is due again
    pub staleness_window: Duration,
    /// Tag used when an artifact has no digest and no selected tag
    pub default_tag: String,
    /// Artifact ids that can never be scanned (structural problems)
    pub unscannable_ids: Vec<String>,
    /// Artifact ids using deprecated image formats
    pub deprecated_ids: Vec<String>,
    /// Optional delay before each scan, to stay under registry rate limits
    pub scan_delay: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            staleness_window: Duration::from_secs(7 * 24 * 3600),
            default_tag: String::from("latest"),
            unscannable_ids: Vec::new(),
            deprecated_ids: Vec::new(),
            scan_delay: Duration::ZERO,
        }
    }
}

/// Aggregate result of one orchestration run. Immutable after return.
#[derive(Debug)]
pub struct BatchResult {
    /// Artifacts the batch was asked to process
    pub total: usize,
    /// Scans that produced a usable result
    pub succeeded: usize,
    /// Scans that failed (including unresolvable artifacts)
    pub failed: usize,
    /// Artifacts skipped because of a live failure-cache entry
    pub skipped: usize,
    /// Updated artifact records, one per success
    pub updated: Vec<Artifact>,
    /// Artifact id → error text for every failure
    pub failures: HashMap<String, String>,
    /// Wall-clock duration of the batch
    pub duration: Duration,
}

/// Per-task terminal outcome.
enum TaskOutcome {
    Skipped,
    Succeeded(Artifact),
    Failed { id: String, error: String },
}

/// Top-level coordinator for batch vulnerability scanning.
pub struct ScanOrchestrator {
    config: OrchestratorConfig,
    scanner_config: ScannerConfig,
    runner: Arc<dyn CommandRunner>,
    failure_cache: Arc<ScanFailureCache>,
    catalog: Arc<dyn CatalogStore>,
}

impl ScanOrchestrator {
    /// Create an orchestrator. All collaborators are injected; there is no
    /// ambient state.
    #[must_use]
    pub fn new(
        config: OrchestratorConfig,
        scanner_config: ScannerConfig,
        runner: Arc<dyn CommandRunner>,
        failure_cache: Arc<ScanFailureCache>,
        catalog: Arc<dyn CatalogStore>,
    ) -> Self {
        Self {
            config,
            scanner_config,
            runner,
            failure_cache,
            catalog,
        }
    }

    /// Returns true if the artifact is on a permanent exclusion list.
    #[must_use]
    pub fn is_excluded(&self, artifact_id: &str) -> bool {
        self.config.unscannable_ids.iter().any(|id| id == artifact_id)
            || self.config.deprecated_ids.iter().any(|id| id == artifact_id)
    }

    /// Pick the artifacts due for a scan.
    ///
    /// An artifact qualifies when it belongs to a scannable source, is not
    /// on an exclusion list, has no live failure-cache entry, and its
    /// security state is never-scanned, unknown, or older than the
    /// staleness window. `force` bypasses the staleness/unknown predicate
    /// but still respects the exclusion lists and the failure cache.
    pub async fn select_needing_scan(
        &self,
        artifacts: &[Artifact],
        force: bool,
    ) -> Result<Vec<Artifact>> {
        let now = Utc::now();
        let staleness = chrono::Duration::from_std(self.config.staleness_window)
            .unwrap_or_else(|_| chrono::Duration::days(7));

        let mut selected = Vec::new();
        for artifact in artifacts {
            if !artifact.source.is_registry() || self.is_excluded(&artifact.id) {
                continue;
            }
            if self.failure_cache.is_failed(&artifact.id).await? {
                debug!(id = %artifact.id, "skipping cache-failed artifact in selection");
                continue;
            }
            if force {
                selected.push(artifact.clone());
                continue;
            }

            let due = match artifact.security.status {
                ScanStatus::Unscanned | ScanStatus::Unknown => true,
                ScanStatus::Ok | ScanStatus::Vulnerable => artifact
                    .security
                    .scan_age(now)
                    .map_or(true, |age| age > staleness),
            };
            if due {
                selected.push(artifact.clone());
            }
        }
        Ok(selected)
    }

    /// Run one batch over the given artifacts.
    ///
    /// Fails fast only when the scanner executable itself is absent; every
    /// per-artifact problem is classified, cached, and recorded in the
    /// batch result instead of propagating.
    pub async fn run_batch(
        &self,
        artifacts: Vec<Artifact>,
        progress: Option<ProgressFn>,
    ) -> Result<BatchResult> {
        let start = Instant::now();
        let total = artifacts.len();

        self.preflight().await?;

        // Batch-scoped scanner cache: removed on drop, success or not.
        let cache_dir = tempfile::Builder::new()
            .prefix("hullscan-cache-")
            .tempdir()?;
        let scanner_config = ScannerConfig {
            cache_dir: Some(cache_dir.path().to_path_buf()),
            ..self.scanner_config.clone()
        };
        let scanner = Arc::new(TrivyScanner::new(scanner_config, Arc::clone(&self.runner)));

        info!(total, concurrency = self.config.concurrency, "starting scan batch");

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let completed = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::with_capacity(total);
        for artifact in artifacts {
            let semaphore = Arc::clone(&semaphore);
            let scanner = Arc::clone(&scanner);
            let failure_cache = Arc::clone(&self.failure_cache);
            let catalog = Arc::clone(&self.catalog);
            let completed = Arc::clone(&completed);
            let progress = progress.clone();
            let default_tag = self.config.default_tag.clone();
            let scan_delay = self.config.scan_delay;

            handles.push(tokio::spawn(async move {
                // The semaphore lives for the whole batch and is never
                // closed, so acquisition cannot fail.
                let _permit = semaphore.acquire().await.ok();

                let outcome = scan_one(
                    artifact,
                    &default_tag,
                    scan_delay,
                    scanner.as_ref(),
                    failure_cache.as_ref(),
                    catalog.as_ref(),
                )
                .await;

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                if let Some(progress) = progress {
                    progress(done, total);
                }
                outcome
            }));
        }

        let mut result = BatchResult {
            total,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            updated: Vec::new(),
            failures: HashMap::new(),
            duration: Duration::ZERO,
        };

        for joined in futures_util::future::join_all(handles).await {
            match joined {
                Ok(TaskOutcome::Succeeded(artifact)) => {
                    result.succeeded += 1;
                    result.updated.push(artifact);
                }
                Ok(TaskOutcome::Skipped) => result.skipped += 1,
                Ok(TaskOutcome::Failed { id, error }) => {
                    result.failed += 1;
                    result.failures.insert(id, error);
                }
                Err(e) => {
                    // A panicked task is an infrastructure bug; the batch
                    // continues without its artifact.
                    warn!(error = %e, "scan task panicked");
                    result.failed += 1;
                }
            }
        }

        result.duration = start.elapsed();
        info!(
            succeeded = result.succeeded,
            failed = result.failed,
            skipped = result.skipped,
            duration_ms = result.duration.as_millis() as u64,
            "scan batch finished"
        );
        Ok(result)
    }

    /// Verify the scanner executable exists before any batch work.
    ///
    /// Probes through the command runner so tests exercise the same path.
    async fn preflight(&self) -> Result<()> {
        let args = vec![String::from("--version")];
        let output = self
            .runner
            .run(&self.scanner_config.scanner_path, &args, Duration::from_secs(10))
            .await
            .map_err(|_| ScanError::ScannerNotFound(self.scanner_config.scanner_path.clone()))?;
        if output.success() {
            Ok(())
        } else {
            Err(ScanError::ScannerNotFound(
                self.scanner_config.scanner_path.clone(),
            ))
        }
    }
}

/// One artifact's pass through the per-batch state machine:
/// pending → (skipped | attempting) → (succeeded | failed).
async fn scan_one(
    mut artifact: Artifact,
    default_tag: &str,
    scan_delay: Duration,
    scanner: &TrivyScanner,
    failure_cache: &ScanFailureCache,
    catalog: &dyn CatalogStore,
) -> TaskOutcome {
    let id = artifact.id.clone();

    // Known-bad artifacts are skipped, not failed.
    match failure_cache.is_failed(&id).await {
        Ok(true) => {
            debug!(%id, "skipping cache-failed artifact");
            return TaskOutcome::Skipped;
        }
        Ok(false) => {}
        Err(e) => warn!(%id, error = %e, "failure-cache read failed, attempting scan"),
    }

    // Resolution failure is a non-retryable per-artifact failure.
    let Some(coordinate) = resolve(&artifact, default_tag) else {
        let error = format!("unresolvable artifact id: {id}");
        record_failure(failure_cache, &id, &error, FailureClass::Permanent).await;
        return TaskOutcome::Failed { id, error };
    };

    if !scan_delay.is_zero() {
        tokio::time::sleep(scan_delay).await;
    }

    let attempt = scanner.scan(&coordinate).await;

    if attempt.success {
        let counts = attempt.counts.unwrap_or_default();
        artifact.security = SecurityState::from_scan(counts, attempt.reference, attempt.finished_at);

        // Persist immediately so a crash mid-batch loses only in-flight
        // work. Persistence is advisory: a store error never turns a
        // successful scan into a failure.
        if let Err(e) = catalog.upsert(std::slice::from_ref(&artifact), true).await {
            warn!(%id, error = %e, "failed to persist scanned artifact");
        }

        debug!(
            %id,
            critical = counts.critical,
            high = counts.high,
            elapsed_ms = attempt.elapsed.as_millis() as u64,
            "scan succeeded"
        );
        return TaskOutcome::Succeeded(artifact);
    }

    let error = attempt
        .error
        .unwrap_or_else(|| String::from("scan failed with no error text"));
    let class = classify(&error);
    record_failure(failure_cache, &id, &error, class).await;
    TaskOutcome::Failed { id, error }
}

/// Cache a failure under its classification-chosen TTL.
async fn record_failure(
    failure_cache: &ScanFailureCache,
    id: &str,
    error: &str,
    class: FailureClass,
) {
    if class == FailureClass::Infrastructure {
        warn!(id, error, "infrastructure failure during scan");
    }
    if let Err(e) = failure_cache
        .mark_failed(id, error, class, cache_ttl(class))
        .await
    {
        warn!(id, error = %e, "failed to record scan failure in cache");
    }
}
