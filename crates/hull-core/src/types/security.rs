//! Security posture types produced by the scanning subsystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Vulnerability counts by severity.
///
/// Produced only by a successful scan: either all-zero ("no findings") or a
/// complete enumeration, never partial.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulnerabilityCounts {
    /// Critical-severity findings
    pub critical: u32,
    /// High-severity findings
    pub high: u32,
    /// Medium-severity findings
    pub medium: u32,
    /// Low-severity findings
    pub low: u32,
}

impl VulnerabilityCounts {
    /// Total findings across all severities.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.critical + self.high + self.medium + self.low
    }

    /// Returns true if no findings were reported at any severity.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.total() == 0
    }

    /// Returns true if critical or high findings are present.
    #[must_use]
    pub const fn has_serious(&self) -> bool {
        self.critical > 0 || self.high > 0
    }
}

/// Scan status of an artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    /// Never scanned
    #[default]
    Unscanned,
    /// Scanned but the result could not be interpreted
    Unknown,
    /// Scanned clean of critical/high findings
    Ok,
    /// Critical or high findings present
    Vulnerable,
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unscanned => write!(f, "unscanned"),
            Self::Unknown => write!(f, "unknown"),
            Self::Ok => write!(f, "ok"),
            Self::Vulnerable => write!(f, "vulnerable"),
        }
    }
}

/// Persisted security state of an artifact.
///
/// A failed scan never mutates this: stale data is preferred over erased
/// data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityState {
    /// Current scan status
    #[serde(default)]
    pub status: ScanStatus,

    /// Counts from the last successful scan
    #[serde(default)]
    pub counts: Option<VulnerabilityCounts>,

    /// When the last successful scan completed
    #[serde(default)]
    pub last_scanned: Option<DateTime<Utc>>,

    /// The image reference actually scanned (digest- or tag-qualified)
    #[serde(default)]
    pub scanned_reference: Option<String>,
}

impl SecurityState {
    /// Build the state recorded after a successful scan.
    #[must_use]
    pub fn from_scan(
        counts: VulnerabilityCounts,
        scanned_reference: String,
        at: DateTime<Utc>,
    ) -> Self {
        let status = if counts.has_serious() {
            ScanStatus::Vulnerable
        } else {
            ScanStatus::Ok
        };
        Self {
            status,
            counts: Some(counts),
            last_scanned: Some(at),
            scanned_reference: Some(scanned_reference),
        }
    }

    /// Age of the last successful scan, if any.
    #[must_use]
    pub fn scan_age(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.last_scanned.map(|t| now - t)
    }
}
