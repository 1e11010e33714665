//! Failure classification and cache-TTL policy.
//!
//! The TTL asymmetry is the key resource-management decision: permanently
//! broken images (manifest gone, unauthorized) must not be retried every
//! run, while transient failures (registry timeout, rate limit) should be
//! retried soon.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Cache TTL for permanent failures.
pub const PERMANENT_FAILURE_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

/// Cache TTL for every non-permanent failure.
pub const RETRY_SOON_TTL: Duration = Duration::from_secs(3600);

/// Classification of a scan failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Retry soon: network timeout, rate limit, cache lock.
    Transient,
    /// Do not retry soon: image/manifest gone, unauthorized, unscannable.
    Permanent,
    /// Scanner crash or pull failure; transient TTL, logged distinctly.
    Infrastructure,
    /// Anything unrecognized; treated as transient.
    Unknown,
}

impl std::fmt::Display for FailureClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::Permanent => write!(f, "permanent"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Select the failure-cache TTL for a classification.
#[must_use]
pub const fn cache_ttl(class: FailureClass) -> Duration {
    match class {
        FailureClass::Permanent => PERMANENT_FAILURE_TTL,
        FailureClass::Transient | FailureClass::Infrastructure | FailureClass::Unknown => {
            RETRY_SOON_TTL
        }
    }
}

/// Classify a failure from its error text.
///
/// Substring taxonomy over the scanner's and pull tool's stderr. Matching
/// is case-insensitive; permanent markers are checked first so that, e.g.,
/// "manifest unknown" inside a longer retry message still pins the image.
#[must_use]
pub fn classify(error_text: &str) -> FailureClass {
    let text = error_text.to_lowercase();

    const PERMANENT_MARKERS: &[&str] = &[
        "manifest unknown",
        "manifest not found",
        "not found",
        "no such image",
        "unauthorized",
        "denied",
        "unsupported media type",
        "unsupported os",
        "unscannable",
    ];
    const TRANSIENT_MARKERS: &[&str] = &[
        "timeout",
        "timed out",
        "deadline exceeded",
        "rate limit",
        "toomanyrequests",
        "too many requests",
        "cache lock",
        "database is locked",
        "connection reset",
        "temporary failure",
    ];
    const INFRA_MARKERS: &[&str] = &[
        "panic",
        "scanner crash",
        "pull failed",
        "failed to pull",
        "no space left",
        "cannot connect to the docker daemon",
    ];

    if PERMANENT_MARKERS.iter().any(|m| text.contains(m)) {
        return FailureClass::Permanent;
    }
    if TRANSIENT_MARKERS.iter().any(|m| text.contains(m)) {
        return FailureClass::Transient;
    }
    if INFRA_MARKERS.iter().any(|m| text.contains(m)) {
        return FailureClass::Infrastructure;
    }
    FailureClass::Unknown
}
