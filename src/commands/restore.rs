use anyhow::Result;
use colored::Colorize;
use relay_billing::config::Config;
use relay_billing::pricing::content_hash;
use tracing::info;

use super::open_pricing;

/// Execute the restore command
///
/// Reinstalls the named backup as the live catalog. The backup itself is
/// kept so it can be restored again later.
pub async fn execute(cfg: &Config, backup: &str) -> Result<()> {
    let pricing = open_pricing(cfg).await?;
    info!("Restoring pricing from backup {}", backup);

    let restored = pricing.restore(backup).await?;

    println!(
        "{} Restored {} model prices from {}",
        "✓".green(),
        restored.len(),
        backup
    );
    println!("  Catalog: {}", pricing.store().catalog_path().display());
    println!("  SHA-256: {}", content_hash(&restored)?);
    println!();
    println!("{}", "Running relays must reload the catalog to bill with the restored prices.".yellow());

    Ok(())
}
