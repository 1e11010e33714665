//! Status command: current security posture per artifact.

use anyhow::{Context, Result};
use colored::Colorize;

use hull_core::{Artifact, ScanStatus};
use hull_store::{CatalogStore, JsonCatalogStore};

use crate::cli::args::StatusArgs;
use crate::config::CliConfig;

/// Execute the status command.
pub async fn execute(config: &CliConfig, args: &StatusArgs, json: bool) -> Result<()> {
    let catalog = JsonCatalogStore::new(&config.catalog_path);
    let mut artifacts = catalog
        .load_all()
        .await
        .with_context(|| format!("failed to load catalog {}", config.catalog_path.display()))?;

    if args.vulnerable_only {
        artifacts.retain(|a| a.security.status == ScanStatus::Vulnerable);
    }

    // Worst posture first.
    artifacts.sort_by_key(|a| match a.security.status {
        ScanStatus::Vulnerable => 0,
        ScanStatus::Unknown => 1,
        ScanStatus::Unscanned => 2,
        ScanStatus::Ok => 3,
    });

    if json {
        println!("{}", serde_json::to_string_pretty(&artifacts)?);
        return Ok(());
    }

    if artifacts.is_empty() {
        println!("{}", "No artifacts in catalog.".dimmed());
        return Ok(());
    }

    println!();
    for artifact in &artifacts {
        print_row(artifact);
    }
    println!();

    let vulnerable = artifacts
        .iter()
        .filter(|a| a.security.status == ScanStatus::Vulnerable)
        .count();
    println!(
        "  {} artifacts, {} vulnerable",
        artifacts.len().to_string().bright_white(),
        vulnerable.to_string().bright_red()
    );
    Ok(())
}

fn print_row(artifact: &Artifact) {
    let status = match artifact.security.status {
        ScanStatus::Vulnerable => "vulnerable".bright_red().bold(),
        ScanStatus::Ok => "ok        ".bright_green(),
        ScanStatus::Unknown => "unknown   ".bright_yellow(),
        ScanStatus::Unscanned => "unscanned ".dimmed(),
    };

    let counts = artifact.security.counts.map_or_else(String::new, |c| {
        format!("C:{} H:{} M:{} L:{}", c.critical, c.high, c.medium, c.low)
    });

    let scanned = artifact
        .security
        .last_scanned
        .map_or_else(String::new, |t| t.format("%Y-%m-%d").to_string());

    println!(
        "  {} {} {} {}",
        status,
        artifact.id.bright_white(),
        counts.dimmed(),
        scanned.dimmed()
    );
}
