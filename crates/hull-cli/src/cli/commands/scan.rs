//! Scan command: run one batch over the catalog.

use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use hull_scan::{ProgressFn, ScanFailureCache, ScanOrchestrator, TokioRunner};
use hull_store::{CatalogStore, JsonCatalogStore, JsonTtlStore};

use crate::cli::args::ScanArgs;
use crate::config::CliConfig;

/// Execute the scan command.
pub async fn execute(config: &CliConfig, args: &ScanArgs, json: bool) -> Result<()> {
    let catalog: Arc<dyn CatalogStore> =
        Arc::new(JsonCatalogStore::new(&config.catalog_path));
    let cache = Arc::new(ScanFailureCache::new(Arc::new(JsonTtlStore::new(
        &config.cache_path,
    ))));

    let mut scanner_config = config.scanner_config();
    if args.local_only {
        scanner_config.remote_first = false;
    }
    let mut orch_config = config.orchestrator_config();
    if let Some(concurrency) = args.concurrency {
        orch_config.concurrency = concurrency;
    }

    let orchestrator = ScanOrchestrator::new(
        orch_config,
        scanner_config,
        Arc::new(TokioRunner),
        cache,
        Arc::clone(&catalog),
    );

    let artifacts = catalog
        .load_all()
        .await
        .with_context(|| format!("failed to load catalog {}", config.catalog_path.display()))?;
    let selected = orchestrator.select_needing_scan(&artifacts, args.force).await?;

    if selected.is_empty() {
        if json {
            println!("{{\"total\":0,\"succeeded\":0,\"failed\":0,\"skipped\":0}}");
        } else {
            println!("{}", "Nothing to scan: all artifacts are current.".green());
        }
        return Ok(());
    }

    let progress = if json {
        None
    } else {
        let bar = ProgressBar::new(selected.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("  {bar:40.cyan/dim} {pos}/{len} scanned")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        let bar_cb = bar.clone();
        let callback: ProgressFn = Arc::new(move |done, _total| {
            bar_cb.set_position(done as u64);
        });
        Some((bar, callback))
    };

    let result = orchestrator
        .run_batch(selected, progress.as_ref().map(|(_, cb)| Arc::clone(cb)))
        .await?;
    if let Some((bar, _)) = progress {
        bar.finish_and_clear();
    }

    if json {
        let failures: serde_json::Value = result
            .failures
            .iter()
            .map(|(id, error)| (id.clone(), serde_json::Value::String(error.clone())))
            .collect::<serde_json::Map<_, _>>()
            .into();
        println!(
            "{}",
            serde_json::json!({
                "total": result.total,
                "succeeded": result.succeeded,
                "failed": result.failed,
                "skipped": result.skipped,
                "duration_secs": result.duration.as_secs_f64(),
                "failures": failures,
            })
        );
        return Ok(());
    }

    println!();
    println!(
        "  {} scanned in {:.1}s: {} succeeded, {} failed, {} skipped",
        result.total.to_string().bright_white(),
        result.duration.as_secs_f64(),
        result.succeeded.to_string().bright_green(),
        result.failed.to_string().bright_red(),
        result.skipped.to_string().bright_yellow(),
    );

    let vulnerable = result
        .updated
        .iter()
        .filter(|a| a.security.counts.is_some_and(|c| c.has_serious()))
        .count();
    if vulnerable > 0 {
        println!(
            "  {} artifacts with critical/high findings",
            vulnerable.to_string().bright_red().bold()
        );
    }

    for (id, error) in &result.failures {
        println!("  {} {} {}", "FAIL".bright_red(), id.bright_white(), error.dimmed());
    }

    println!();
    Ok(())
}
