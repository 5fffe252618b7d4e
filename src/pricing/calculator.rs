use crate::error::{BillingError, Result};
use crate::pricing::models::{CostBreakdown, PriceQuote, UsageVector};
use crate::pricing::multiplier::RateMultiplier;
use std::num::NonZeroU64;

/// Token denomination catalog prices are quoted against by default
///
/// The `*_cost_per_token` catalog fields hold the price of a single token.
pub const DEFAULT_UNIT_SIZE: u64 = 1;

const PER_TOKEN: NonZeroU64 = match NonZeroU64::new(DEFAULT_UNIT_SIZE) {
    Some(n) => n,
    None => panic!("unit size is zero"),
};

const PER_MILLION: NonZeroU64 = match NonZeroU64::new(1_000_000) {
    Some(n) => n,
    None => panic!("unit size is zero"),
};

/// Calculator for computing request costs based on token usage
#[derive(Debug, Clone, Copy)]
pub struct CostCalculator {
    unit_size: NonZeroU64,
}

impl CostCalculator {
    /// Create a calculator for prices quoted per `unit_size` tokens
    pub fn new(unit_size: NonZeroU64) -> Self {
        Self { unit_size }
    }

    /// Calculator for prices quoted per single token
    pub fn per_token() -> Self {
        Self {
            unit_size: PER_TOKEN,
        }
    }

    /// Calculator for prices quoted per 1M tokens
    pub fn per_million() -> Self {
        Self {
            unit_size: PER_MILLION,
        }
    }

    /// Build from a raw configured denomination
    pub fn from_unit_size(unit_size: u64) -> Result<Self> {
        NonZeroU64::new(unit_size).map(Self::new).ok_or_else(|| {
            BillingError::MalformedCatalog("unit size must be greater than zero".to_string())
        })
    }

    pub fn unit_size(&self) -> u64 {
        self.unit_size.get()
    }

    /// Cost at list price; `actual` equals `total`
    ///
    /// Components are computed and summed in a fixed order (input, output,
    /// cache write, cache read) so identical inputs give identical bits.
    pub fn compute_unscaled(&self, usage: &UsageVector, quote: &PriceQuote) -> CostBreakdown {
        let input_cost = self.component_cost(usage.input_tokens, quote.input_price);
        let output_cost = self.component_cost(usage.output_tokens, quote.output_price);
        let cache_write_cost =
            self.component_cost(usage.cache_create_tokens, quote.cache_write_price);
        let cache_read_cost = self.component_cost(usage.cache_read_tokens, quote.cache_read_price);

        let total = input_cost + output_cost + cache_write_cost + cache_read_cost;

        CostBreakdown {
            input_cost,
            output_cost,
            cache_write_cost,
            cache_read_cost,
            total,
            actual: total,
        }
    }

    /// Scale the billed amount, leaving the itemized list-price costs intact
    ///
    /// This composes: the result bills `breakdown.actual * m`, so applying
    /// `m1` then `m2` bills `total * m1 * m2`. Pass the breakdown returned by
    /// [`compute_unscaled`](Self::compute_unscaled) to bill exactly
    /// `total * m`; only on such a breakdown is `m = 1.0` a no-op for every
    /// input.
    pub fn apply_multiplier(breakdown: &CostBreakdown, multiplier: RateMultiplier) -> CostBreakdown {
        CostBreakdown {
            input_cost: breakdown.input_cost,
            output_cost: breakdown.output_cost,
            cache_write_cost: breakdown.cache_write_cost,
            cache_read_cost: breakdown.cache_read_cost,
            total: breakdown.total,
            actual: breakdown.actual * multiplier.value(),
        }
    }

    /// Unscaled cost followed by the multiplier
    pub fn compute(
        &self,
        usage: &UsageVector,
        quote: &PriceQuote,
        multiplier: RateMultiplier,
    ) -> CostBreakdown {
        Self::apply_multiplier(&self.compute_unscaled(usage, quote), multiplier)
    }

    fn component_cost(&self, tokens: u64, unit_price: Option<f64>) -> f64 {
        match unit_price {
            Some(price) => (tokens as f64 / self.unit_size.get() as f64) * price,
            None => 0.0,
        }
    }
}

impl Default for CostCalculator {
    fn default() -> Self {
        Self::per_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sonnet() -> PriceQuote {
        PriceQuote::new("claude-3-5-sonnet-20241022")
            .with_input_price(3.0)
            .with_output_price(15.0)
            .with_cache_write_price(3.75)
            .with_cache_read_price(0.3)
    }

    fn assert_close(left: f64, right: f64) {
        assert!(
            (left - right).abs() < 1e-12,
            "expected {} to be within 1e-12 of {}",
            left,
            right
        );
    }

    #[test]
    fn test_cost_calculation_with_cache() {
        let calculator = CostCalculator::per_million();

        // 1M tokens each
        let usage = UsageVector::new(1_000_000, 1_000_000, 1_000_000, 1_000_000);
        let breakdown = calculator.compute_unscaled(&usage, &sonnet());

        assert_eq!(breakdown.input_cost, 3.0);
        assert_eq!(breakdown.output_cost, 15.0);
        assert_eq!(breakdown.cache_write_cost, 3.75);
        assert_eq!(breakdown.cache_read_cost, 0.3);
        assert_close(breakdown.total, 22.05);
        assert_eq!(breakdown.actual, breakdown.total);
    }

    #[test]
    fn test_cost_calculation_no_cache() {
        let calculator = CostCalculator::per_million();
        let quote = PriceQuote::new("gpt-4o")
            .with_input_price(2.5)
            .with_output_price(10.0);

        let usage = UsageVector::new(1_000_000, 1_000_000, 500, 700);
        let breakdown = calculator.compute_unscaled(&usage, &quote);

        assert_eq!(breakdown.input_cost, 2.5);
        assert_eq!(breakdown.output_cost, 10.0);
        assert_eq!(breakdown.cache_write_cost, 0.0);
        assert_eq!(breakdown.cache_read_cost, 0.0);
        assert_eq!(breakdown.total, 12.5);
    }

    #[test]
    fn test_end_to_end_example() {
        let calculator = CostCalculator::per_million();
        let usage = UsageVector::new(1000, 500, 200, 100);

        let unscaled = calculator.compute_unscaled(&usage, &sonnet());
        assert_close(unscaled.input_cost, 0.003);
        assert_close(unscaled.output_cost, 0.0075);
        assert_close(unscaled.cache_write_cost, 0.00075);
        assert_close(unscaled.cache_read_cost, 0.00003);
        assert_close(unscaled.total, 0.01128);

        let billed =
            CostCalculator::apply_multiplier(&unscaled, RateMultiplier::new(2.0).unwrap());
        assert_close(billed.actual, 0.02256);
        assert_eq!(billed.total, unscaled.total);
        assert_eq!(billed.input_cost, unscaled.input_cost);
    }

    #[test]
    fn test_unit_multiplier_is_identity() {
        let calculator = CostCalculator::per_million();
        let usage = UsageVector::new(12_345, 678, 9, 10_111);
        let unscaled = calculator.compute_unscaled(&usage, &sonnet());

        let billed = CostCalculator::apply_multiplier(&unscaled, RateMultiplier::ONE);
        assert_eq!(billed.actual, unscaled.total);
        assert_eq!(billed, unscaled);
    }

    #[test]
    fn test_scaling_composes() {
        let calculator = CostCalculator::per_million();
        let usage = UsageVector::new(1000, 500, 200, 100);
        let unscaled = calculator.compute_unscaled(&usage, &sonnet());

        for (m1, m2) in [(1.5, 0.8), (2.0, 2.0), (0.5, 3.0), (1e-3, 250.0)] {
            let once = CostCalculator::apply_multiplier(&unscaled, RateMultiplier::new(m1).unwrap());
            let twice = CostCalculator::apply_multiplier(&once, RateMultiplier::new(m2).unwrap());
            assert!((unscaled.total * (m1 * m2) - twice.actual).abs() < 1e-9);
            assert_eq!(twice.total, unscaled.total);
        }
    }

    #[test]
    fn test_absent_cache_write_price_bills_zero() {
        let calculator = CostCalculator::per_million();
        let quote = PriceQuote::new("gemini-1.5-pro")
            .with_input_price(1.25)
            .with_output_price(5.0)
            .with_cache_read_price(0.3125);

        let usage = UsageVector::new(0, 0, 1_000_000, 0);
        let breakdown = calculator.compute_unscaled(&usage, &quote);
        assert_eq!(breakdown.cache_write_cost, 0.0);
        assert_eq!(breakdown.total, 0.0);
    }

    #[test]
    fn test_deterministic_output() {
        let calculator = CostCalculator::per_million();
        let usage = UsageVector::new(987_654, 123_457, 31_337, 4_242);
        let m = RateMultiplier::new(1.37).unwrap();

        let first = calculator.compute(&usage, &sonnet(), m);
        let second = calculator.compute(&usage, &sonnet(), m);
        assert_eq!(first.actual.to_bits(), second.actual.to_bits());
        assert_eq!(first.total.to_bits(), second.total.to_bits());
    }

    #[test]
    fn test_custom_unit_size() {
        let calculator = CostCalculator::from_unit_size(1).unwrap();
        let quote = PriceQuote::new("claude-3-5-haiku-20241022").with_input_price(0.000001);
        let breakdown = calculator.compute_unscaled(&UsageVector::new(1_000_000, 0, 0, 0), &quote);
        assert_close(breakdown.input_cost, 1.0);
        assert_eq!(calculator.unit_size(), 1);
    }

    #[test]
    fn test_zero_unit_size_rejected() {
        assert!(CostCalculator::from_unit_size(0).is_err());
        assert_eq!(CostCalculator::default().unit_size(), DEFAULT_UNIT_SIZE);
    }

    #[test]
    fn test_default_denomination_bills_per_token_prices() {
        // Catalog fields carry dollars per token, e.g. $3/MTok is 0.000003
        let quote = PriceQuote::new("claude-3-5-sonnet-20241022")
            .with_input_price(0.000003)
            .with_output_price(0.000015)
            .with_cache_write_price(0.00000375)
            .with_cache_read_price(0.0000003);

        let calculator = CostCalculator::from_unit_size(DEFAULT_UNIT_SIZE).unwrap();
        let breakdown = calculator.compute_unscaled(&UsageVector::new(1000, 500, 200, 100), &quote);

        assert_close(breakdown.input_cost, 0.003);
        assert_close(breakdown.output_cost, 0.0075);
        assert_close(breakdown.cache_write_cost, 0.00075);
        assert_close(breakdown.cache_read_cost, 0.00003);
        assert_close(breakdown.total, 0.01128);
    }

    #[test]
    fn test_multiplier_applies_to_billed_amount() {
        let calculator = CostCalculator::per_million();
        let unscaled = calculator.compute_unscaled(&UsageVector::new(1000, 500, 200, 100), &sonnet());

        let once = CostCalculator::apply_multiplier(&unscaled, RateMultiplier::new(2.0).unwrap());
        // Identity holds on any breakdown, scaled or not
        assert_eq!(CostCalculator::apply_multiplier(&once, RateMultiplier::ONE), once);
        // A second factor multiplies the already billed amount, not the list total
        let again = CostCalculator::apply_multiplier(&once, RateMultiplier::new(2.0).unwrap());
        assert_close(again.actual, unscaled.total * 4.0);
    }
}
