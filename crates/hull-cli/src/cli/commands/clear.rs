//! Clear-failure command: make an artifact eligible for scanning again.

use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;

use hull_scan::ScanFailureCache;
use hull_store::JsonTtlStore;

use crate::cli::args::ClearFailureArgs;
use crate::config::CliConfig;

/// Execute the clear-failure command.
pub async fn execute(config: &CliConfig, args: &ClearFailureArgs) -> Result<()> {
    let cache = ScanFailureCache::new(Arc::new(JsonTtlStore::new(&config.cache_path)));

    match cache.failure_info(&args.id).await? {
        Some(info) => {
            cache.clear_failure(&args.id).await?;
            println!(
                "  Cleared {} failure for {} ({})",
                info.class.to_string().bright_yellow(),
                args.id.bright_white(),
                info.error.dimmed()
            );
        }
        None => {
            println!("  No cached failure for {}", args.id.bright_white());
        }
    }
    Ok(())
}
