use crate::pricing::{UnknownModelPolicy, DEFAULT_UNIT_SIZE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub billing: BillingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PricingConfig {
    /// Catalog file (default: "./data/model_pricing.json")
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    /// Where backups are written (default: the catalog's directory)
    #[serde(default)]
    pub backup_dir: Option<PathBuf>,

    /// Token denomination catalog prices are quoted against (default: 1, the
    /// `*_cost_per_token` fields are per-token prices)
    #[serde(default = "default_unit_size")]
    pub unit_size: u64,

    /// Billing behaviour for models missing from the catalog (default: "zero")
    #[serde(default)]
    pub unknown_model: UnknownModelPolicy,

    /// Models whose prices are shown before/after an adjustment
    #[serde(default = "default_preview_models")]
    pub preview_models: Vec<String>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            catalog_path: default_catalog_path(),
            backup_dir: None,
            unit_size: default_unit_size(),
            unknown_model: UnknownModelPolicy::default(),
            preview_models: default_preview_models(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BillingConfig {
    /// Multiplier for accounts without an override (unset = 1.0)
    #[serde(default)]
    pub default_rate_multiplier: Option<f64>,

    /// Per-account multipliers, account id -> multiplier
    #[serde(default)]
    pub rate_overrides: HashMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "text" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("./data/model_pricing.json")
}

fn default_unit_size() -> u64 {
    DEFAULT_UNIT_SIZE
}

fn default_preview_models() -> Vec<String> {
    vec![
        "claude-sonnet-4-5-20250929".to_string(),
        "claude-3-5-sonnet-20241022".to_string(),
        "claude-3-5-haiku-20241022".to_string(),
    ]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Load configuration from an optional TOML file overlaid with
/// `RELAY_BILLING__*` environment variables
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let config = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(config::Environment::with_prefix("RELAY_BILLING").separator("__"))
        .build()?;

    let cfg: Config = config.try_deserialize()?;
    validate_config(&cfg)?;

    Ok(cfg)
}

pub fn validate_config(cfg: &Config) -> anyhow::Result<()> {
    if cfg.pricing.catalog_path.as_os_str().is_empty() {
        anyhow::bail!("pricing.catalog_path cannot be empty");
    }

    if cfg.pricing.unit_size == 0 {
        anyhow::bail!("pricing.unit_size must be greater than zero");
    }

    if let Some(value) = cfg.billing.default_rate_multiplier {
        if !is_valid_multiplier(value) {
            anyhow::bail!(
                "billing.default_rate_multiplier must be a positive number, got {}",
                value
            );
        }
    }

    for (account, value) in &cfg.billing.rate_overrides {
        if account.is_empty() {
            anyhow::bail!("billing.rate_overrides contains an empty account id");
        }
        if !is_valid_multiplier(*value) {
            anyhow::bail!(
                "billing.rate_overrides: multiplier for '{}' must be a positive number, got {}",
                account,
                value
            );
        }
    }

    if !matches!(cfg.logging.format.as_str(), "text" | "json") {
        anyhow::bail!("logging.format must be 'text' or 'json', got '{}'", cfg.logging.format);
    }

    Ok(())
}

fn is_valid_multiplier(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
