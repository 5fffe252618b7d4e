use anyhow::{Context, Result};
use colored::Colorize;
use relay_billing::config::Config;
use relay_billing::pricing::{AdjustOutcome, PriceQuote, RateMultiplier};
use tracing::info;

use super::open_pricing;

const TOKENS_PER_MTOK: f64 = 1_000_000.0;

/// Execute the adjust command
///
/// Multiplies every price in the catalog file by `multiplier` after saving a
/// timestamped backup next to it.
pub async fn execute(cfg: &Config, multiplier: &str) -> Result<()> {
    let multiplier: RateMultiplier = multiplier
        .parse()
        .context("Please provide a positive multiplier, e.g. 1.5 (+50%) or 0.8 (-20%)")?;

    let pricing = open_pricing(cfg).await?;
    info!("Adjusting pricing by {}", multiplier);

    let outcome = pricing.adjust(multiplier.value()).await?;

    println!(
        "{} Backed up original prices to: {}",
        "✓".green(),
        outcome.backup_path.display()
    );
    println!(
        "{} Pricing adjusted: {} models multiplied by {}",
        "✓".green(),
        outcome.current.len(),
        multiplier.value()
    );

    print_preview(cfg, &outcome);

    println!();
    println!("{}", "Running relays must reload the catalog to bill with the new prices.".yellow());
    println!("To restore the previous prices:");
    if let Some(name) = outcome.backup_path.file_name() {
        println!("   billing restore {}", name.to_string_lossy());
    }

    Ok(())
}

fn print_preview(cfg: &Config, outcome: &AdjustOutcome) {
    let mut header_printed = false;

    for model in &cfg.pricing.preview_models {
        let (Some(before), Some(after)) = (outcome.previous.get(model), outcome.current.get(model))
        else {
            continue;
        };

        if !header_printed {
            println!();
            println!("Example price changes:");
            header_printed = true;
        }

        println!();
        println!("  {}:", model.bold());
        for (label, old, new) in price_pairs(before, after, cfg.pricing.unit_size) {
            println!("    {:<12} ${:.2}/MTok → ${:.2}/MTok", label, old, new);
        }
    }
}

/// Non-absent before/after prices converted to dollars per million tokens
fn price_pairs(
    before: &PriceQuote,
    after: &PriceQuote,
    unit_size: u64,
) -> Vec<(&'static str, f64, f64)> {
    let per_mtok = TOKENS_PER_MTOK / unit_size.max(1) as f64;
    let labels = ["Input:", "Output:", "Cache write:", "Cache read:"];
    let old_prices = before.prices();
    let new_prices = after.prices();

    let mut pairs = Vec::new();
    for ((label, (_, old)), (_, new)) in labels.into_iter().zip(old_prices).zip(new_prices) {
        if let (Some(old), Some(new)) = (old, new) {
            pairs.push((label, old * per_mtok, new * per_mtok));
        }
    }
    pairs
}
