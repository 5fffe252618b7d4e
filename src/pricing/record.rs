use crate::clock::Clock;
use crate::error::{BillingError, Result};
use crate::pricing::models::{CostBreakdown, RawUsage, UsageVector};
use crate::pricing::multiplier::RateMultiplier;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Immutable record of one billing event, handed to the external store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageRecord {
    timestamp: DateTime<Utc>,
    account_id: String,
    model_name: String,
    usage: UsageVector,
    rate_multiplier: RateMultiplier,
    cost_breakdown: CostBreakdown,
}

impl UsageRecord {
    pub fn builder() -> UsageRecordBuilder {
        UsageRecordBuilder::default()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn usage(&self) -> &UsageVector {
        &self.usage
    }

    pub fn rate_multiplier(&self) -> RateMultiplier {
        self.rate_multiplier
    }

    pub fn cost_breakdown(&self) -> &CostBreakdown {
        &self.cost_breakdown
    }

    /// Billed amount
    pub fn cost(&self) -> f64 {
        self.cost_breakdown.actual
    }
}

/// Collects the parts of a [`UsageRecord`]; nothing is validated until `build`
#[derive(Debug, Clone, Default)]
pub struct UsageRecordBuilder {
    account_id: Option<String>,
    model_name: Option<String>,
    usage: Option<RawUsage>,
    rate_multiplier: Option<RateMultiplier>,
    cost_breakdown: Option<CostBreakdown>,
}

impl UsageRecordBuilder {
    pub fn account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = Some(model_name.into());
        self
    }

    pub fn usage(mut self, usage: impl Into<RawUsage>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    pub fn rate_multiplier(mut self, multiplier: RateMultiplier) -> Self {
        self.rate_multiplier = Some(multiplier);
        self
    }

    pub fn cost_breakdown(mut self, breakdown: CostBreakdown) -> Self {
        self.cost_breakdown = Some(breakdown);
        self
    }

    /// Assemble the record, stamping it with `clock`
    pub fn build(self, clock: &dyn Clock) -> Result<UsageRecord> {
        let account_id = required_text(self.account_id, "account_id")?;
        let model_name = required_text(self.model_name, "model_name")?;
        let usage = self
            .usage
            .ok_or_else(|| missing("usage"))
            .and_then(UsageVector::try_from)?;
        let rate_multiplier = self.rate_multiplier.ok_or_else(|| missing("rate_multiplier"))?;
        let cost_breakdown = self.cost_breakdown.ok_or_else(|| missing("cost_breakdown"))?;

        Ok(UsageRecord {
            timestamp: clock.now(),
            account_id,
            model_name,
            usage,
            rate_multiplier,
            cost_breakdown,
        })
    }
}

fn required_text(value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(missing(field)),
    }
}

fn missing(field: &str) -> BillingError {
    BillingError::IncompleteInput(format!("{} is required", field))
}
