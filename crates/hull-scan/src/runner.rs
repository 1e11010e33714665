//! Subprocess execution behind a narrow seam.
//!
//! The scanner and orchestrator only ever see [`CommandRunner`], so tests
//! substitute a stub instead of spawning real processes.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, ScanError};

/// Cap on captured stderr carried into error text and the failure cache.
const STDERR_CAP: usize = 2048;

/// Captured output of a finished subprocess.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code (`-1` when terminated by signal)
    pub status: i32,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr, truncated to a fixed cap
    pub stderr: String,
}

impl CommandOutput {
    /// Returns true for a zero exit code.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.status == 0
    }
}

/// Runs external commands with a hard timeout.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, killing it if it outlives `timeout`.
    ///
    /// A non-zero exit is NOT an error here; callers inspect the status.
    /// Errors are reserved for spawn failures and timeouts.
    async fn run(&self, program: &str, args: &[String], timeout: Duration)
        -> Result<CommandOutput>;
}

/// Production runner over `tokio::process`.
///
/// `kill_on_drop` guarantees the child does not outlive a timed-out or
/// cancelled attempt.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioRunner;

#[async_trait]
impl CommandRunner for TokioRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<CommandOutput> {
        debug!(program, ?args, ?timeout, "running command");

        let child = Command::new(program)
            .args(args)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ScanError::Spawn {
                command: program.to_string(),
                source: e,
            })?;

        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| ScanError::Timeout {
                command: program.to_string(),
                timeout,
            })?
            .map_err(|e| ScanError::Spawn {
                command: program.to_string(),
                source: e,
            })?;

        Ok(CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: truncate(&String::from_utf8_lossy(&output.stderr), STDERR_CAP),
        })
    }
}

/// Truncate to at most `cap` bytes on a char boundary.
fn truncate(text: &str, cap: usize) -> String {
    if text.len() <= cap {
        return text.to_string();
    }
    let mut end = cap;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
