//! Catalog artifact records.

use serde::{Deserialize, Serialize};

use super::security::SecurityState;

/// Platform an artifact was discovered on.
///
/// Only registry-backed platforms can be resolved to a scannable image
/// reference; everything else is out of scope for the scanning subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourcePlatform {
    /// Docker Hub registry (`docker.io`)
    DockerHub,
    /// GitHub repository (source-only, not directly scannable)
    Github,
}

impl SourcePlatform {
    /// Returns true if artifacts from this platform can be scanned.
    #[must_use]
    pub const fn is_registry(self) -> bool {
        matches!(self, Self::DockerHub)
    }
}

impl std::fmt::Display for SourcePlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DockerHub => write!(f, "docker"),
            Self::Github => write!(f, "github"),
        }
    }
}

/// A cataloged container-image artifact.
///
/// The catalog owns these records long-term; the scanning subsystem borrows
/// one for a single scan cycle and hands back an updated copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// Stable identifier of form `source:namespace/name`
    pub id: String,

    /// Platform the artifact lives on
    pub source: SourcePlatform,

    /// Content-addressed digest captured at discovery time, if any
    #[serde(default)]
    pub digest: Option<String>,

    /// Tag previously selected for this artifact, if any
    #[serde(default)]
    pub selected_tag: Option<String>,

    /// Tags known to exist for this artifact
    #[serde(default)]
    pub available_tags: Vec<String>,

    /// Current security posture
    #[serde(default)]
    pub security: SecurityState,
}

impl Artifact {
    /// Create a minimal artifact with never-scanned security state.
    #[must_use]
    pub fn new(id: impl Into<String>, source: SourcePlatform) -> Self {
        Self {
            id: id.into(),
            source,
            digest: None,
            selected_tag: None,
            available_tags: Vec::new(),
            security: SecurityState::default(),
        }
    }

    /// Split the id into `(source, namespace, name)` components.
    ///
    /// Returns `None` when the id does not carry both the `:` and `/`
    /// separators. Malformed ids are a data problem, not a panic.
    #[must_use]
    pub fn id_parts(&self) -> Option<(&str, &str, &str)> {
        let (source, rest) = self.id.split_once(':')?;
        let (namespace, name) = rest.split_once('/')?;
        if source.is_empty() || namespace.is_empty() || name.is_empty() {
            return None;
        }
        Some((source, namespace, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_parts_well_formed() {
        let artifact = Artifact::new("docker:library/nginx", SourcePlatform::DockerHub);
        assert_eq!(artifact.id_parts(), Some(("docker", "library", "nginx")));
    }

    #[test]
    fn id_parts_malformed() {
        let missing_slash = Artifact::new("docker:nginx", SourcePlatform::DockerHub);
        assert_eq!(missing_slash.id_parts(), None);

        let missing_colon = Artifact::new("library/nginx", SourcePlatform::DockerHub);
        assert_eq!(missing_colon.id_parts(), None);

        let empty_name = Artifact::new("docker:library/", SourcePlatform::DockerHub);
        assert_eq!(empty_name.id_parts(), None);
    }

    #[test]
    fn registry_platforms() {
        assert!(SourcePlatform::DockerHub.is_registry());
        assert!(!SourcePlatform::Github.is_registry());
    }
}
