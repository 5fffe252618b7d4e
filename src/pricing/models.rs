use crate::error::{BillingError, Result};
use crate::pricing::multiplier::RateMultiplier;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Per-model price quote
///
/// Prices are kept exactly as the catalog source states them, in currency per
/// `unit_size` tokens (see [`crate::pricing::CostCalculator`]). The source
/// fields are per-token prices, so the default unit size is 1. An absent
/// price bills that component at zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceQuote {
    pub model_name: String,
    #[serde(rename = "input_cost_per_token", skip_serializing_if = "Option::is_none")]
    pub input_price: Option<f64>,
    #[serde(rename = "output_cost_per_token", skip_serializing_if = "Option::is_none")]
    pub output_price: Option<f64>,
    #[serde(
        rename = "cache_creation_input_token_cost",
        skip_serializing_if = "Option::is_none"
    )]
    pub cache_write_price: Option<f64>,
    #[serde(
        rename = "cache_read_input_token_cost",
        skip_serializing_if = "Option::is_none"
    )]
    pub cache_read_price: Option<f64>,
    /// Other keys carried by the source record, written back untouched
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl PriceQuote {
    /// Create a quote with no prices set
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            input_price: None,
            output_price: None,
            cache_write_price: None,
            cache_read_price: None,
            metadata: Map::new(),
        }
    }

    pub fn with_input_price(mut self, price: f64) -> Self {
        self.input_price = Some(price);
        self
    }

    pub fn with_output_price(mut self, price: f64) -> Self {
        self.output_price = Some(price);
        self
    }

    pub fn with_cache_write_price(mut self, price: f64) -> Self {
        self.cache_write_price = Some(price);
        self
    }

    pub fn with_cache_read_price(mut self, price: f64) -> Self {
        self.cache_read_price = Some(price);
        self
    }

    /// Prices in fixed component order: input, output, cache write, cache read
    pub fn prices(&self) -> [(&'static str, Option<f64>); 4] {
        [
            ("input", self.input_price),
            ("output", self.output_price),
            ("cache_write", self.cache_write_price),
            ("cache_read", self.cache_read_price),
        ]
    }

    /// Check that every present price is a finite, non-negative number
    pub fn validate(&self) -> Result<()> {
        if self.model_name.trim().is_empty() {
            return Err(BillingError::MalformedCatalog(
                "quote has an empty model name".to_string(),
            ));
        }

        for (component, price) in self.prices() {
            if let Some(price) = price {
                if !price.is_finite() || price < 0.0 {
                    return Err(BillingError::MalformedCatalog(format!(
                        "model '{}': {} price must be a finite non-negative number, got {}",
                        self.model_name, component, price
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Token counts for one billing event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageVector {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_create_tokens: u64,
    pub cache_read_tokens: u64,
}

impl UsageVector {
    pub fn new(
        input_tokens: u64,
        output_tokens: u64,
        cache_create_tokens: u64,
        cache_read_tokens: u64,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            cache_create_tokens,
            cache_read_tokens,
        }
    }

    pub fn total_tokens(&self) -> u64 {
        self.input_tokens
            .saturating_add(self.output_tokens)
            .saturating_add(self.cache_create_tokens)
            .saturating_add(self.cache_read_tokens)
    }
}

/// Usage as reported by the relay, where any count may be missing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawUsage {
    #[serde(default)]
    pub input_tokens: Option<u64>,
    #[serde(default)]
    pub output_tokens: Option<u64>,
    #[serde(default)]
    pub cache_create_tokens: Option<u64>,
    #[serde(default)]
    pub cache_read_tokens: Option<u64>,
}

impl RawUsage {
    pub fn is_empty(&self) -> bool {
        self.input_tokens.is_none()
            && self.output_tokens.is_none()
            && self.cache_create_tokens.is_none()
            && self.cache_read_tokens.is_none()
    }
}

impl From<UsageVector> for RawUsage {
    fn from(usage: UsageVector) -> Self {
        Self {
            input_tokens: Some(usage.input_tokens),
            output_tokens: Some(usage.output_tokens),
            cache_create_tokens: Some(usage.cache_create_tokens),
            cache_read_tokens: Some(usage.cache_read_tokens),
        }
    }
}

impl TryFrom<RawUsage> for UsageVector {
    type Error = BillingError;

    /// Missing counts are zero, but at least one must be reported
    fn try_from(raw: RawUsage) -> Result<Self> {
        if raw.is_empty() {
            return Err(BillingError::IncompleteInput(
                "usage has no token counts".to_string(),
            ));
        }

        Ok(Self {
            input_tokens: raw.input_tokens.unwrap_or(0),
            output_tokens: raw.output_tokens.unwrap_or(0),
            cache_create_tokens: raw.cache_create_tokens.unwrap_or(0),
            cache_read_tokens: raw.cache_read_tokens.unwrap_or(0),
        })
    }
}

/// Itemized cost for one billing event
///
/// `total` is the unscaled sum of the four components and `actual` is the
/// billed amount after the rate multiplier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub input_cost: f64,
    pub output_cost: f64,
    pub cache_write_cost: f64,
    pub cache_read_cost: f64,
    pub total: f64,
    pub actual: f64,
}

impl CostBreakdown {
    /// Create a zero-cost breakdown
    pub fn zero() -> Self {
        Self::default()
    }

    /// Billed amount minus unscaled amount (positive = markup)
    pub fn adjustment(&self) -> f64 {
        self.actual - self.total
    }
}

/// How a multiplier moves the billed amount relative to list price
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MultiplierEffect {
    Markup { percent: f64 },
    Discount { percent: f64 },
    Unchanged,
}

impl MultiplierEffect {
    pub fn of(multiplier: RateMultiplier) -> Self {
        let m = multiplier.value();
        if m > 1.0 {
            Self::Markup {
                percent: (m - 1.0) * 100.0,
            }
        } else if m < 1.0 {
            Self::Discount {
                percent: (1.0 - m) * 100.0,
            }
        } else {
            Self::Unchanged
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_validate_rejects_negative_price() {
        let quote = PriceQuote::new("claude-3-5-haiku-20241022").with_output_price(-1.0);
        let err = quote.validate().unwrap_err();
        assert!(matches!(err, BillingError::MalformedCatalog(_)));
        assert!(err.to_string().contains("output"));
    }

    #[test]
    fn test_quote_validate_rejects_non_finite_price() {
        let quote = PriceQuote::new("gpt-4o").with_input_price(f64::NAN);
        assert!(quote.validate().is_err());

        let quote = PriceQuote::new("gpt-4o").with_cache_read_price(f64::INFINITY);
        assert!(quote.validate().is_err());
    }

    #[test]
    fn test_quote_validate_accepts_absent_and_zero() {
        let quote = PriceQuote::new("gpt-4o").with_input_price(0.0);
        assert!(quote.validate().is_ok());
    }

    #[test]
    fn test_raw_usage_fills_missing_counts_with_zero() {
        let raw = RawUsage {
            input_tokens: Some(10),
            ..RawUsage::default()
        };
        let usage = UsageVector::try_from(raw).unwrap();
        assert_eq!(usage, UsageVector::new(10, 0, 0, 0));
    }

    #[test]
    fn test_raw_usage_all_missing_is_incomplete() {
        let err = UsageVector::try_from(RawUsage::default()).unwrap_err();
        assert!(matches!(err, BillingError::IncompleteInput(_)));
    }

    #[test]
    fn test_multiplier_effect() {
        let markup = MultiplierEffect::of(RateMultiplier::new(1.5).unwrap());
        match markup {
            MultiplierEffect::Markup { percent } => assert!((percent - 50.0).abs() < 1e-9),
            other => panic!("Expected markup, got {:?}", other),
        }

        let discount = MultiplierEffect::of(RateMultiplier::new(0.8).unwrap());
        match discount {
            MultiplierEffect::Discount { percent } => assert!((percent - 20.0).abs() < 1e-9),
            other => panic!("Expected discount, got {:?}", other),
        }

        assert_eq!(
            MultiplierEffect::of(RateMultiplier::ONE),
            MultiplierEffect::Unchanged
        );
    }
}
