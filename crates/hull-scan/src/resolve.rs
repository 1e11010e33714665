//! Artifact → image-coordinate resolution.
//!
//! Pure functions, no I/O. Digest-first: a previously captured digest always
//! produces a content-addressed, reproducible reference. The tag fallback is
//! a degraded path retained for artifacts discovered before digests were
//! recorded.

use hull_core::Artifact;

/// Docker Hub's implicit namespace for official images.
const OFFICIAL_NAMESPACE: &str = "library";

/// A resolved, scannable image reference.
///
/// Digest coordinates are content-addressed and reproducible; tag
/// coordinates are mutable and only used when no digest was captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageCoordinate {
    /// `repository@sha256:...`
    Digest { repository: String, digest: String },
    /// `repository:tag`
    Tag { repository: String, tag: String },
}

impl ImageCoordinate {
    /// Render the reference the scanner is invoked with.
    #[must_use]
    pub fn reference(&self) -> String {
        match self {
            Self::Digest { repository, digest } => format!("{repository}@{digest}"),
            Self::Tag { repository, tag } => format!("{repository}:{tag}"),
        }
    }

    /// The repository part without digest/tag qualifier.
    #[must_use]
    pub fn repository(&self) -> &str {
        match self {
            Self::Digest { repository, .. } | Self::Tag { repository, .. } => repository,
        }
    }

    /// Returns true for content-addressed (digest) coordinates.
    #[must_use]
    pub const fn is_pinned(&self) -> bool {
        matches!(self, Self::Digest { .. })
    }
}

impl std::fmt::Display for ImageCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reference())
    }
}

/// Resolve an artifact to a scannable image coordinate.
///
/// Returns `None` when the artifact's platform is not a registry this
/// subsystem understands, or when the id cannot be split into
/// `source:namespace/name`. Malformed ids are a per-artifact failure for
/// the orchestrator to record, never a panic.
#[must_use]
pub fn resolve(artifact: &Artifact, default_tag: &str) -> Option<ImageCoordinate> {
    if !artifact.source.is_registry() {
        return None;
    }

    let (_, namespace, name) = artifact.id_parts()?;

    // Official images are addressed bare, without the library/ prefix.
    let repository = if namespace == OFFICIAL_NAMESPACE {
        name.to_string()
    } else {
        format!("{namespace}/{name}")
    };

    if let Some(digest) = artifact.digest.as_deref().filter(|d| !d.is_empty()) {
        return Some(ImageCoordinate::Digest {
            repository,
            digest: digest.to_string(),
        });
    }

    let tag = artifact
        .selected_tag
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or(default_tag);
    Some(ImageCoordinate::Tag {
        repository,
        tag: tag.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hull_core::SourcePlatform;

    fn artifact(id: &str) -> Artifact {
        Artifact::new(id, SourcePlatform::DockerHub)
    }

    #[test]
    fn digest_always_wins_over_tags() {
        let mut a = artifact("docker:grafana/grafana");
        a.digest = Some("sha256:deadbeef".into());
        a.selected_tag = Some("11.2".into());
        a.available_tags = vec!["latest".into(), "11.2".into()];

        let coord = resolve(&a, "latest").unwrap();
        assert_eq!(coord.reference(), "grafana/grafana@sha256:deadbeef");
        assert!(coord.is_pinned());
    }

    #[test]
    fn official_image_drops_library_namespace() {
        let mut a = artifact("docker:library/nginx");
        a.digest = Some("sha256:abc123".into());

        let coord = resolve(&a, "latest").unwrap();
        assert_eq!(coord.reference(), "nginx@sha256:abc123");
    }

    #[test]
    fn tag_fallback_uses_configured_default() {
        let a = artifact("docker:library/redis");
        let coord = resolve(&a, "latest").unwrap();
        assert_eq!(coord.reference(), "redis:latest");
        assert!(!coord.is_pinned());
    }

    #[test]
    fn tag_fallback_prefers_selected_tag() {
        let mut a = artifact("docker:bitnami/postgresql");
        a.selected_tag = Some("16.4.0".into());
        let coord = resolve(&a, "latest").unwrap();
        assert_eq!(coord.reference(), "bitnami/postgresql:16.4.0");
    }

    #[test]
    fn malformed_id_resolves_to_none() {
        assert!(resolve(&artifact("docker:no-slash-here"), "latest").is_none());
        assert!(resolve(&artifact("no-colon/name"), "latest").is_none());
        assert!(resolve(&artifact(""), "latest").is_none());
    }

    #[test]
    fn non_registry_platform_resolves_to_none() {
        let a = Artifact::new("github:torvalds/linux", SourcePlatform::Github);
        assert!(resolve(&a, "latest").is_none());
    }

    #[test]
    fn empty_digest_falls_back_to_tag() {
        let mut a = artifact("docker:library/alpine");
        a.digest = Some(String::new());
        let coord = resolve(&a, "latest").unwrap();
        assert_eq!(coord.reference(), "alpine:latest");
    }
}
