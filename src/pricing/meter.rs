use crate::clock::Clock;
use crate::error::{BillingError, Result};
use crate::pricing::calculator::CostCalculator;
use crate::pricing::models::{CostBreakdown, RawUsage, UsageVector};
use crate::pricing::multiplier::{self, RateOverrideSource};
use crate::pricing::record::UsageRecord;
use crate::pricing::service::PricingService;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// What to bill when a model has no quote in the catalog
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownModelPolicy {
    /// Record the event at zero cost
    #[default]
    #[serde(rename = "zero")]
    BillZero,
    /// Refuse the event with `NotFound`
    Reject,
}

/// Turns relay usage reports into usage records
pub struct UsageMeter {
    pricing: Arc<PricingService>,
    overrides: Arc<dyn RateOverrideSource>,
    calculator: CostCalculator,
    default_multiplier: Option<f64>,
    unknown_model: UnknownModelPolicy,
    clock: Arc<dyn Clock>,
}

impl UsageMeter {
    pub fn new(
        pricing: Arc<PricingService>,
        overrides: Arc<dyn RateOverrideSource>,
        calculator: CostCalculator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pricing,
            overrides,
            calculator,
            default_multiplier: None,
            unknown_model: UnknownModelPolicy::default(),
            clock,
        }
    }

    pub fn with_default_multiplier(mut self, default_multiplier: Option<f64>) -> Self {
        self.default_multiplier = default_multiplier;
        self
    }

    pub fn with_unknown_model_policy(mut self, policy: UnknownModelPolicy) -> Self {
        self.unknown_model = policy;
        self
    }

    /// Price one billing event and build its record
    pub async fn record_usage(
        &self,
        account_id: &str,
        model_name: &str,
        usage: RawUsage,
    ) -> Result<UsageRecord> {
        if model_name.trim().is_empty() {
            return Err(BillingError::IncompleteInput(
                "model_name is required".to_string(),
            ));
        }
        let usage_vector = UsageVector::try_from(usage)?;

        let unscaled = match self.pricing.lookup(model_name) {
            Ok(quote) => self.calculator.compute_unscaled(&usage_vector, &quote),
            Err(BillingError::NotFound(reason)) => match self.unknown_model {
                UnknownModelPolicy::BillZero => {
                    warn!("No pricing data for model: {}", model_name);
                    CostBreakdown::zero()
                }
                UnknownModelPolicy::Reject => return Err(BillingError::NotFound(reason)),
            },
            Err(e) => return Err(e),
        };

        let account_override = self.overrides.rate_override(account_id).await?;
        let rate = multiplier::resolve(account_override, self.default_multiplier)?;
        let billed = CostCalculator::apply_multiplier(&unscaled, rate);

        let record = UsageRecord::builder()
            .account_id(account_id)
            .model_name(model_name)
            .usage(usage)
            .rate_multiplier(rate)
            .cost_breakdown(billed)
            .build(self.clock.as_ref())?;

        debug!(
            account = account_id,
            model = model_name,
            multiplier = rate.value(),
            total = billed.total,
            actual = billed.actual,
            "Usage recorded"
        );
        Ok(record)
    }
}
