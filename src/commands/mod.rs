//! Command implementations for the CLI
//!
//! - adjust: Multiply every catalog price, keeping a backup
//! - restore: Reinstall a backup
//! - backups: List backups
//! - simulate: Compare billed cost across multipliers
//! - record: Meter one event and print its usage record
//! - test: Validate configuration and catalog

pub mod adjust;
pub mod backups;
pub mod record;
pub mod restore;
pub mod simulate;

use anyhow::{Context, Result};
use relay_billing::clock::{Clock, SystemClock};
use relay_billing::config::Config;
use relay_billing::pricing::{
    CostCalculator, InMemoryOverrides, PricingFile, PricingService, UsageMeter,
};
use std::sync::Arc;

pub(crate) fn pricing_file(cfg: &Config) -> PricingFile {
    PricingFile::new(cfg.pricing.catalog_path.clone(), cfg.pricing.backup_dir.clone())
}

/// Load the configured catalog into a pricing service
pub(crate) async fn open_pricing(cfg: &Config) -> Result<PricingService> {
    let store = pricing_file(cfg);
    PricingService::open(store, Arc::new(SystemClock))
        .await
        .with_context(|| {
            format!(
                "Failed to load pricing catalog from {}",
                cfg.pricing.catalog_path.display()
            )
        })
}

/// Wire a usage meter from configuration
pub(crate) fn build_meter(cfg: &Config, pricing: Arc<PricingService>) -> Result<UsageMeter> {
    let calculator = CostCalculator::from_unit_size(cfg.pricing.unit_size)?;
    let overrides = Arc::new(InMemoryOverrides::from_map(&cfg.billing.rate_overrides));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    Ok(UsageMeter::new(pricing, overrides, calculator, clock)
        .with_default_multiplier(cfg.billing.default_rate_multiplier)
        .with_unknown_model_policy(cfg.pricing.unknown_model))
}

/// Human label for the price denomination
pub(crate) fn unit_label(unit_size: u64) -> String {
    match unit_size {
        1 => "token".to_string(),
        1_000 => "KTok".to_string(),
        1_000_000 => "MTok".to_string(),
        n => format!("{} tokens", n),
    }
}
