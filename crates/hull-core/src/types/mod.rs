//! Shared data model for the hullscan catalog.

mod artifact;
mod security;

pub use artifact::{Artifact, SourcePlatform};
pub use security::{ScanStatus, SecurityState, VulnerabilityCounts};
