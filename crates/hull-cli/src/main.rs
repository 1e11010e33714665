//! hullscan - container-artifact security catalog CLI.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    hull_cli::run().await
}
