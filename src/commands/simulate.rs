use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use relay_billing::config::Config;
use relay_billing::pricing::{
    CostBreakdown, CostCalculator, MultiplierEffect, RateMultiplier, RawUsage, UsageVector,
};

use super::{open_pricing, unit_label};

const DEFAULT_MULTIPLIERS: [f64; 5] = [1.0, 1.5, 0.8, 2.0, 0.5];

/// Execute the simulate command
///
/// Prices one event for `model` and shows the billed amount under each
/// multiplier, without recording anything.
pub async fn execute(cfg: &Config, model: &str, usage: RawUsage, multipliers: &[f64]) -> Result<()> {
    let multipliers = parse_multipliers(multipliers)?;
    let usage = UsageVector::try_from(usage)?;

    let pricing = open_pricing(cfg).await?;
    let quote = pricing.lookup(model)?;
    let calculator = CostCalculator::from_unit_size(cfg.pricing.unit_size)?;
    let unscaled = calculator.compute_unscaled(&usage, &quote);

    let unit = unit_label(cfg.pricing.unit_size);
    println!("Usage:");
    println!("  Input:        {} tokens", usage.input_tokens);
    println!("  Output:       {} tokens", usage.output_tokens);
    println!("  Cache create: {} tokens", usage.cache_create_tokens);
    println!("  Cache read:   {} tokens", usage.cache_read_tokens);
    println!();
    println!("Prices for {} (per {}):", model, unit);
    for (label, price) in quote.prices() {
        match price {
            Some(price) => println!("  {:<12} ${}", label, price),
            None => println!("  {:<12} -", label),
        }
    }
    println!();
    print_breakdown(&unscaled);
    println!();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("MULTIPLIER").fg(Color::Cyan),
        Cell::new("LIST COST").fg(Color::Cyan),
        Cell::new("BILLED").fg(Color::Cyan),
        Cell::new("DIFFERENCE").fg(Color::Cyan),
    ]);

    for multiplier in multipliers {
        let billed = CostCalculator::apply_multiplier(&unscaled, multiplier);
        table.add_row(vec![
            Cell::new(multiplier.to_string()),
            Cell::new(format!("${:.6}", billed.total)),
            Cell::new(format!("${:.6}", billed.actual)),
            Cell::new(describe_effect(&billed, multiplier)),
        ]);
    }

    println!("{}", table);
    Ok(())
}

fn parse_multipliers(values: &[f64]) -> Result<Vec<RateMultiplier>> {
    let values = if values.is_empty() {
        &DEFAULT_MULTIPLIERS[..]
    } else {
        values
    };

    Ok(values
        .iter()
        .map(|&value| RateMultiplier::new(value))
        .collect::<Result<Vec<_>, _>>()?)
}

fn print_breakdown(breakdown: &CostBreakdown) {
    println!("List cost:");
    println!("  Input:       ${:.6}", breakdown.input_cost);
    println!("  Output:      ${:.6}", breakdown.output_cost);
    println!("  Cache write: ${:.6}", breakdown.cache_write_cost);
    println!("  Cache read:  ${:.6}", breakdown.cache_read_cost);
    println!("  ─────────────────────────────");
    println!("  Total:       ${:.6}", breakdown.total);
}

fn describe_effect(billed: &CostBreakdown, multiplier: RateMultiplier) -> String {
    match MultiplierEffect::of(multiplier) {
        MultiplierEffect::Markup { percent } => {
            format!("+${:.6} (+{:.1}%)", billed.adjustment().abs(), percent)
        }
        MultiplierEffect::Discount { percent } => {
            format!("-${:.6} (-{:.1}%)", billed.adjustment().abs(), percent)
        }
        MultiplierEffect::Unchanged => "unchanged".to_string(),
    }
}
