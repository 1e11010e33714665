//! Command-line argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Catalog containerized artifacts and keep their security posture current.
///
/// Scans are driven through an external vulnerability scanner (trivy by
/// default) at bounded concurrency; results persist incrementally, so an
/// interrupted batch never loses completed work.
#[derive(Parser, Debug)]
#[command(name = "hullscan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file path (default: platform config dir)
    #[arg(short, long, global = true, env = "HULLSCAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Catalog file path, overriding the config file
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Emit JSON instead of human-readable output
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan artifacts whose security state is missing or stale
    Scan(ScanArgs),

    /// Show the current security posture of cataloged artifacts
    Status(StatusArgs),

    /// Drop an artifact's failure-cache entry so it is retried next batch
    ClearFailure(ClearFailureArgs),
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Re-scan everything scannable, ignoring staleness
    #[arg(short, long)]
    pub force: bool,

    /// Override the configured concurrency limit
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Skip the registry-direct tier and always pull first
    #[arg(long)]
    pub local_only: bool,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Only show artifacts with critical or high findings
    #[arg(long)]
    pub vulnerable_only: bool,
}

#[derive(Args, Debug)]
pub struct ClearFailureArgs {
    /// Artifact id, e.g. docker:library/nginx
    pub id: String,
}
