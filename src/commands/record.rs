use anyhow::Result;
use relay_billing::config::Config;
use relay_billing::pricing::RawUsage;
use std::sync::Arc;

use super::{build_meter, open_pricing};

/// Execute the record command
///
/// Runs one event through the meter with the configured multipliers and
/// prints the usage record a relay would persist.
pub async fn execute(cfg: &Config, account: &str, model: &str, usage: RawUsage) -> Result<()> {
    let pricing = Arc::new(open_pricing(cfg).await?);
    let meter = build_meter(cfg, pricing)?;

    let record = meter.record_usage(account, model, usage).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);

    Ok(())
}
