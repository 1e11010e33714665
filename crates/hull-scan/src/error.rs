use std::time::Duration;

use thiserror::Error;

/// Result type alias for scanning operations
pub type Result<T> = std::result::Result<T, ScanError>;

/// Errors from the scanning core.
///
/// Per-artifact failures never propagate out of a batch: the orchestrator
/// classifies them, caches them, and records them in the batch result. The
/// variants here surface only where a whole batch cannot proceed (scanner
/// missing) or inside a single scan attempt.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The scanner executable is not on PATH; no artifact could succeed.
    #[error("scanner executable not found: {0}")]
    ScannerNotFound(String),

    /// Subprocess exceeded its timeout and was killed.
    #[error("{command} timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    /// Subprocess could not be spawned or communicated with.
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Failure-cache read/write failed.
    #[error("failure cache error: {0}")]
    Cache(#[from] hull_store::StoreError),

    /// Batch-scoped scanner cache directory could not be created.
    #[error("scanner cache dir error: {0}")]
    CacheDir(#[from] std::io::Error),
}

impl ScanError {
    /// Stderr-style text used for failure classification.
    #[must_use]
    pub fn failure_text(&self) -> String {
        match self {
            Self::Timeout { .. } => "timeout".to_string(),
            other => other.to_string(),
        }
    }
}
