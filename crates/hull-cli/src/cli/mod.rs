//! CLI entry point and command dispatch.

pub mod args;
pub mod commands;

use anyhow::Result;
use clap::Parser;

use crate::config::CliConfig;
use args::{Cli, Commands};

/// Parse arguments and run the selected command.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(CliConfig::default_path);
    let mut config = CliConfig::load(&config_path)?;
    if let Some(catalog) = &cli.catalog {
        config.catalog_path.clone_from(catalog);
    }

    match cli.command {
        Commands::Scan(ref args) => commands::scan::execute(&config, args, cli.json).await,
        Commands::Status(ref args) => commands::status::execute(&config, args, cli.json).await,
        Commands::ClearFailure(ref args) => commands::clear::execute(&config, args).await,
    }
}
