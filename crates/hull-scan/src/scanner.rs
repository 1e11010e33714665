//! Two-tier external vulnerability scanner wrapper.
//!
//! Tier 1 scans the registry directly (no layer download); tier 2 pulls the
//! image and scans the local copy. A remote-tier failure is never surfaced
//! to the caller, it just falls through to the local tier. Every subprocess
//! carries its own timeout and is killed on expiry.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use hull_core::VulnerabilityCounts;

use crate::resolve::ImageCoordinate;
use crate::runner::CommandRunner;

/// Scanner configuration.
///
/// Injected explicitly; there is no ambient state. The orchestrator sets
/// `cache_dir` to a batch-scoped temporary directory.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Scanner executable (default `trivy`)
    pub scanner_path: String,
    /// Registry pull tool executable (default `docker`)
    pub pull_tool_path: String,
    /// Timeout for the remote (no-pull) tier
    pub remote_timeout: Duration,
    /// Timeout for the local scan after a pull
    pub local_timeout: Duration,
    /// Timeout for the image pull itself
    pub pull_timeout: Duration,
    /// Whether to try the remote tier first (default true)
    pub remote_first: bool,
    /// Scanner database cache directory; `None` uses the scanner's default
    pub cache_dir: Option<PathBuf>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            scanner_path: String::from("trivy"),
            pull_tool_path: String::from("docker"),
            remote_timeout: Duration::from_secs(120),
            local_timeout: Duration::from_secs(300),
            pull_timeout: Duration::from_secs(600),
            remote_first: true,
            cache_dir: None,
        }
    }
}

/// Outcome of one scan attempt. Created fresh per attempt, immutable,
/// consumed once by the orchestrator.
#[derive(Debug, Clone)]
pub struct ScanAttempt {
    /// Whether the scan produced a usable result
    pub success: bool,
    /// Severity counts; present iff `success`
    pub counts: Option<VulnerabilityCounts>,
    /// Error text; present iff not `success`
    pub error: Option<String>,
    /// Wall-clock time spent on the attempt (all tiers)
    pub elapsed: Duration,
    /// The reference actually scanned
    pub reference: String,
    /// When the attempt finished
    pub finished_at: DateTime<Utc>,
}

impl ScanAttempt {
    fn succeeded(counts: VulnerabilityCounts, reference: String, elapsed: Duration) -> Self {
        Self {
            success: true,
            counts: Some(counts),
            error: None,
            elapsed,
            reference,
            finished_at: Utc::now(),
        }
    }

    fn failed(error: String, reference: String, elapsed: Duration) -> Self {
        Self {
            success: false,
            counts: None,
            error: Some(error),
            elapsed,
            reference,
            finished_at: Utc::now(),
        }
    }
}

/// Wrapper around the external `trivy` scanner and `docker` pull tool.
pub struct TrivyScanner {
    config: ScannerConfig,
    runner: Arc<dyn CommandRunner>,
}

impl TrivyScanner {
    /// Create a scanner with the given configuration and subprocess runner.
    #[must_use]
    pub fn new(config: ScannerConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    /// Scan an image using the configured tier order.
    pub async fn scan(&self, coordinate: &ImageCoordinate) -> ScanAttempt {
        self.scan_with(coordinate, self.config.remote_first).await
    }

    /// Scan an image, overriding the remote-first behavior for this call.
    pub async fn scan_with(&self, coordinate: &ImageCoordinate, remote_first: bool) -> ScanAttempt {
        let reference = coordinate.reference();
        let start = Instant::now();

        if remote_first {
            match self.try_remote(&reference).await {
                Some(counts) => {
                    return ScanAttempt::succeeded(counts, reference, start.elapsed());
                }
                None => {
                    debug!(%reference, "remote tier failed, falling back to local scan");
                }
            }
        }

        self.run_local(&reference, start).await
    }

    /// Remote tier: scan the registry directly, no pull.
    ///
    /// Any failure here (spawn, timeout, non-zero exit) reads as `None`;
    /// the caller falls through to the local tier.
    async fn try_remote(&self, reference: &str) -> Option<VulnerabilityCounts> {
        let args = self.scan_args(reference, true);
        let output = match self
            .runner
            .run(&self.config.scanner_path, &args, self.config.remote_timeout)
            .await
        {
            Ok(output) => output,
            Err(e) => {
                debug!(reference, error = %e, "remote scan did not complete");
                return None;
            }
        };

        if !output.success() {
            debug!(
                reference,
                status = output.status,
                stderr = %output.stderr,
                "remote scan exited non-zero"
            );
            return None;
        }

        Some(parse_severity_counts(&output.stdout))
    }

    /// Local tier: pull the image, then scan the local copy.
    async fn run_local(&self, reference: &str, start: Instant) -> ScanAttempt {
        let pull_args = vec![String::from("pull"), reference.to_string()];
        match self
            .runner
            .run(&self.config.pull_tool_path, &pull_args, self.config.pull_timeout)
            .await
        {
            Ok(output) if !output.success() => {
                warn!(reference, stderr = %output.stderr, "image pull failed");
                return ScanAttempt::failed(
                    format!("pull failed: {}", output.stderr),
                    reference.to_string(),
                    start.elapsed(),
                );
            }
            Ok(_) => {}
            Err(e) => {
                return ScanAttempt::failed(
                    e.failure_text(),
                    reference.to_string(),
                    start.elapsed(),
                );
            }
        }

        let args = self.scan_args(reference, false);
        let output = match self
            .runner
            .run(&self.config.scanner_path, &args, self.config.local_timeout)
            .await
        {
            Ok(output) => output,
            Err(e) => {
                return ScanAttempt::failed(
                    e.failure_text(),
                    reference.to_string(),
                    start.elapsed(),
                );
            }
        };

        if !output.success() {
            return ScanAttempt::failed(
                output.stderr,
                reference.to_string(),
                start.elapsed(),
            );
        }

        ScanAttempt::succeeded(
            parse_severity_counts(&output.stdout),
            reference.to_string(),
            start.elapsed(),
        )
    }

    /// Build the scanner argument list for one tier.
    fn scan_args(&self, reference: &str, remote: bool) -> Vec<String> {
        let mut args = vec![
            String::from("image"),
            String::from("--format"),
            String::from("json"),
            String::from("--scanners"),
            String::from("vuln"),
            String::from("--severity"),
            String::from("CRITICAL,HIGH,MEDIUM,LOW"),
        ];
        if remote {
            args.push(String::from("--image-src"));
            args.push(String::from("remote"));
        }
        if let Some(dir) = &self.config.cache_dir {
            args.push(String::from("--cache-dir"));
            args.push(dir.display().to_string());
        }
        args.push(reference.to_string());
        args
    }
}

#[derive(Debug, Deserialize)]
struct TrivyReport {
    #[serde(default, rename = "Results")]
    results: Vec<TrivyResult>,
}

#[derive(Debug, Deserialize)]
struct TrivyResult {
    #[serde(default, rename = "Vulnerabilities")]
    vulnerabilities: Vec<TrivyVulnerability>,
}

#[derive(Debug, Deserialize)]
struct TrivyVulnerability {
    #[serde(default, rename = "Severity")]
    severity: String,
}

/// Fold the scanner's JSON report into severity counts.
///
/// Unparsable output yields all-zero counts rather than a failure; callers
/// only read counts when the attempt itself succeeded.
fn parse_severity_counts(stdout: &str) -> VulnerabilityCounts {
    let report: TrivyReport = match serde_json::from_str(stdout) {
        Ok(report) => report,
        Err(e) => {
            debug!(error = %e, "unparsable scanner output, treating as no findings");
            return VulnerabilityCounts::default();
        }
    };

    let mut counts = VulnerabilityCounts::default();
    for result in &report.results {
        for vuln in &result.vulnerabilities {
            match vuln.severity.as_str() {
                "CRITICAL" => counts.critical += 1,
                "HIGH" => counts.high += 1,
                "MEDIUM" => counts.medium += 1,
                "LOW" => counts.low += 1,
                other => debug!(severity = other, "ignoring unrecognized severity"),
            }
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, ScanError};
    use crate::runner::CommandOutput;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const REPORT: &str = r#"{
        "Results": [
            {"Vulnerabilities": [
                {"Severity": "CRITICAL"},
                {"Severity": "HIGH"},
                {"Severity": "HIGH"},
                {"Severity": "MEDIUM"},
                {"Severity": "LOW"},
                {"Severity": "UNKNOWN"}
            ]},
            {"Vulnerabilities": [{"Severity": "LOW"}]}
        ]
    }"#;

    /// Scripted runner: pops one response per invocation, records calls.
    struct ScriptedRunner {
        responses: Mutex<Vec<Result<CommandOutput>>>,
        calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl ScriptedRunner {
        fn new(responses: Vec<Result<CommandOutput>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(String, Vec<String>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(
            &self,
            program: &str,
            args: &[String],
            _timeout: Duration,
        ) -> Result<CommandOutput> {
            self.calls
                .lock()
                .unwrap()
                .push((program.to_string(), args.to_vec()));
            let mut responses = self.responses.lock().unwrap();
            assert!(!responses.is_empty(), "unexpected extra command: {program}");
            responses.remove(0)
        }
    }

    fn ok_output(stdout: &str) -> Result<CommandOutput> {
        Ok(CommandOutput {
            status: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
        })
    }

    fn failed_output(status: i32, stderr: &str) -> Result<CommandOutput> {
        Ok(CommandOutput {
            status,
            stdout: String::new(),
            stderr: stderr.to_string(),
        })
    }

    fn coord() -> ImageCoordinate {
        ImageCoordinate::Tag {
            repository: "nginx".into(),
            tag: "latest".into(),
        }
    }

    fn scanner(runner: Arc<ScriptedRunner>) -> TrivyScanner {
        TrivyScanner::new(ScannerConfig::default(), runner)
    }

    #[test]
    fn parse_counts_by_severity() {
        let counts = parse_severity_counts(REPORT);
        assert_eq!(counts.critical, 1);
        assert_eq!(counts.high, 2);
        assert_eq!(counts.medium, 1);
        assert_eq!(counts.low, 2);
    }

    #[test]
    fn unparsable_output_is_zero_counts() {
        assert!(parse_severity_counts("garbage").is_clean());
        assert!(parse_severity_counts("").is_clean());
    }

    #[tokio::test]
    async fn remote_success_skips_local_tier() {
        let runner = Arc::new(ScriptedRunner::new(vec![ok_output(REPORT)]));
        let attempt = scanner(runner.clone()).scan(&coord()).await;

        assert!(attempt.success);
        assert_eq!(attempt.counts.unwrap().critical, 1);

        let calls = runner.calls();
        assert_eq!(calls.len(), 1, "no pull, no local scan");
        assert_eq!(calls[0].0, "trivy");
        assert!(calls[0].1.iter().any(|a| a == "--image-src"));
    }

    #[tokio::test]
    async fn remote_failure_falls_through_to_local() {
        let runner = Arc::new(ScriptedRunner::new(vec![
            failed_output(1, "FATAL remote image scan failed"),
            ok_output(""),        // docker pull
            ok_output(REPORT),    // local scan
        ]));
        let attempt = scanner(runner.clone()).scan(&coord()).await;

        assert!(attempt.success);
        let calls = runner.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1].0, "docker");
        assert_eq!(calls[1].1[0], "pull");
        // Local tier must not pass --image-src remote.
        assert!(!calls[2].1.iter().any(|a| a == "--image-src"));
    }

    #[tokio::test]
    async fn remote_timeout_is_not_surfaced() {
        let runner = Arc::new(ScriptedRunner::new(vec![
            Err(ScanError::Timeout {
                command: "trivy".into(),
                timeout: Duration::from_secs(120),
            }),
            ok_output(""),
            ok_output(REPORT),
        ]));
        let attempt = scanner(runner).scan(&coord()).await;
        assert!(attempt.success);
    }

    #[tokio::test]
    async fn pull_failure_fails_the_attempt() {
        let runner = Arc::new(ScriptedRunner::new(vec![
            failed_output(1, "remote unavailable"),
            failed_output(1, "manifest unknown"),
        ]));
        let attempt = scanner(runner).scan(&coord()).await;

        assert!(!attempt.success);
        assert!(attempt.error.as_deref().unwrap().contains("manifest unknown"));
        assert!(attempt.counts.is_none());
    }

    #[tokio::test]
    async fn remote_first_override_goes_straight_to_local() {
        let runner = Arc::new(ScriptedRunner::new(vec![
            ok_output(""),     // docker pull
            ok_output(REPORT), // local scan
        ]));
        let attempt = scanner(runner.clone())
            .scan_with(&coord(), false)
            .await;

        assert!(attempt.success);
        assert_eq!(runner.calls()[0].0, "docker");
    }

    #[tokio::test]
    async fn cache_dir_flag_is_passed_through() {
        let config = ScannerConfig {
            cache_dir: Some(PathBuf::from("/tmp/batch-cache")),
            ..ScannerConfig::default()
        };
        let runner = Arc::new(ScriptedRunner::new(vec![ok_output(REPORT)]));
        let attempt = TrivyScanner::new(config, runner.clone()).scan(&coord()).await;

        assert!(attempt.success);
        let args = &runner.calls()[0].1;
        let pos = args.iter().position(|a| a == "--cache-dir").unwrap();
        assert_eq!(args[pos + 1], "/tmp/batch-cache");
    }
}
