pub mod adjuster;
pub mod calculator;
pub mod catalog;
pub mod meter;
pub mod models;
pub mod multiplier;
pub mod record;
pub mod service;
pub mod store;

pub use adjuster::{CatalogBackup, PricingAdjuster};
pub use calculator::{CostCalculator, DEFAULT_UNIT_SIZE};
pub use catalog::PricingCatalog;
pub use meter::{UnknownModelPolicy, UsageMeter};
pub use models::{CostBreakdown, MultiplierEffect, PriceQuote, RawUsage, UsageVector};
pub use multiplier::{resolve, InMemoryOverrides, RateMultiplier, RateOverrideSource};
pub use record::{UsageRecord, UsageRecordBuilder};
pub use service::{AdjustOutcome, PricingService};
pub use store::{content_hash, BackupEntry, PricingFile};
