//! CLI configuration: TOML file under the platform config directory,
//! falling back to defaults when absent.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use hull_scan::{OrchestratorConfig, ScannerConfig};

/// Top-level CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Catalog JSON file (default: platform data dir)
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    /// Failure-cache JSON file (default: platform data dir)
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,

    /// Scanner settings
    #[serde(default)]
    pub scanner: ScannerSection,

    /// Batch settings
    #[serde(default)]
    pub batch: BatchSection,
}

/// `[scanner]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerSection {
    /// Scanner executable
    #[serde(default = "default_scanner_path")]
    pub path: String,

    /// Registry pull tool executable
    #[serde(default = "default_pull_tool")]
    pub pull_tool: String,

    /// Remote-tier timeout in seconds
    #[serde(default = "default_remote_timeout")]
    pub remote_timeout_secs: u64,

    /// Local-tier scan timeout in seconds
    #[serde(default = "default_local_timeout")]
    pub local_timeout_secs: u64,

    /// Image pull timeout in seconds
    #[serde(default = "default_pull_timeout")]
    pub pull_timeout_secs: u64,

    /// Try the registry-direct tier before pulling
    #[serde(default = "default_true")]
    pub remote_first: bool,
}

/// `[batch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSection {
    /// Upper bound on in-flight scans
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Re-scan artifacts older than this many days
    #[serde(default = "default_staleness_days")]
    pub staleness_days: u64,

    /// Tag used when an artifact has no digest and no selected tag
    #[serde(default = "default_tag")]
    pub default_tag: String,

    /// Delay before each scan in milliseconds (registry rate limiting)
    #[serde(default)]
    pub scan_delay_ms: u64,

    /// Artifact ids that can never be scanned
    #[serde(default)]
    pub unscannable_ids: Vec<String>,

    /// Artifact ids using deprecated image formats
    #[serde(default)]
    pub deprecated_ids: Vec<String>,
}

impl Default for ScannerSection {
    fn default() -> Self {
        Self {
            path: default_scanner_path(),
            pull_tool: default_pull_tool(),
            remote_timeout_secs: default_remote_timeout(),
            local_timeout_secs: default_local_timeout(),
            pull_timeout_secs: default_pull_timeout(),
            remote_first: true,
        }
    }
}

impl Default for BatchSection {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            staleness_days: default_staleness_days(),
            default_tag: default_tag(),
            scan_delay_ms: 0,
            unscannable_ids: Vec::new(),
            deprecated_ids: Vec::new(),
        }
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            catalog_path: default_catalog_path(),
            cache_path: default_cache_path(),
            scanner: ScannerSection::default(),
            batch: BatchSection::default(),
        }
    }
}

impl CliConfig {
    /// Load config from a TOML file, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Default config file location.
    #[must_use]
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("io", "hullscan", "hullscan").map_or_else(
            || PathBuf::from("hullscan.toml"),
            |dirs| dirs.config_dir().join("config.toml"),
        )
    }

    /// Build the scanner configuration.
    #[must_use]
    pub fn scanner_config(&self) -> ScannerConfig {
        ScannerConfig {
            scanner_path: self.scanner.path.clone(),
            pull_tool_path: self.scanner.pull_tool.clone(),
            remote_timeout: Duration::from_secs(self.scanner.remote_timeout_secs),
            local_timeout: Duration::from_secs(self.scanner.local_timeout_secs),
            pull_timeout: Duration::from_secs(self.scanner.pull_timeout_secs),
            remote_first: self.scanner.remote_first,
            cache_dir: None,
        }
    }

    /// Build the orchestrator configuration.
    #[must_use]
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            concurrency: self.batch.concurrency,
            staleness_window: Duration::from_secs(self.batch.staleness_days * 24 * 3600),
            default_tag: self.batch.default_tag.clone(),
            unscannable_ids: self.batch.unscannable_ids.clone(),
            deprecated_ids: self.batch.deprecated_ids.clone(),
            scan_delay: Duration::from_millis(self.batch.scan_delay_ms),
        }
    }
}

fn data_dir() -> PathBuf {
    directories::ProjectDirs::from("io", "hullscan", "hullscan")
        .map_or_else(|| PathBuf::from("."), |dirs| dirs.data_dir().to_path_buf())
}

fn default_catalog_path() -> PathBuf {
    data_dir().join("catalog.json")
}

fn default_cache_path() -> PathBuf {
    data_dir().join("failure_cache.json")
}

fn default_scanner_path() -> String {
    String::from("trivy")
}

fn default_pull_tool() -> String {
    String::from("docker")
}

const fn default_remote_timeout() -> u64 {
    120
}

const fn default_local_timeout() -> u64 {
    300
}

const fn default_pull_timeout() -> u64 {
    600
}

const fn default_true() -> bool {
    true
}

const fn default_concurrency() -> usize {
    4
}

const fn default_staleness_days() -> u64 {
    7
}

fn default_tag() -> String {
    String::from("latest")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_values() {
        let config = CliConfig::default();
        assert_eq!(config.scanner.path, "trivy");
        assert_eq!(config.batch.concurrency, 4);
        assert_eq!(config.batch.staleness_days, 7);
        assert!(config.scanner.remote_first);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let config = CliConfig::load(Path::new("/nonexistent/hullscan.toml")).unwrap();
        assert_eq!(config.batch.default_tag, "latest");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            [batch]
            concurrency = 8
            unscannable_ids = ["docker:broken/image"]
            "#
        )
        .unwrap();

        let config = CliConfig::load(file.path()).unwrap();
        assert_eq!(config.batch.concurrency, 8);
        assert_eq!(config.batch.unscannable_ids, vec!["docker:broken/image"]);
        // Untouched sections keep defaults.
        assert_eq!(config.scanner.pull_tool, "docker");
        assert_eq!(config.batch.staleness_days, 7);
    }

    #[test]
    fn orchestrator_config_conversion() {
        let mut config = CliConfig::default();
        config.batch.staleness_days = 14;
        config.batch.scan_delay_ms = 250;

        let orch = config.orchestrator_config();
        assert_eq!(orch.staleness_window, Duration::from_secs(14 * 24 * 3600));
        assert_eq!(orch.scan_delay, Duration::from_millis(250));
    }
}
