use crate::clock::Clock;
use crate::error::{BillingError, Result};
use crate::pricing::catalog::PricingCatalog;
use crate::pricing::models::PriceQuote;
use crate::pricing::multiplier::RateMultiplier;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Full copy of a catalog taken right before an adjustment
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogBackup {
    pub created_at: DateTime<Utc>,
    pub catalog: PricingCatalog,
}

impl CatalogBackup {
    /// Catalog to reinstall as the live one
    pub fn restore(self) -> PricingCatalog {
        self.catalog
    }
}

/// Applies a bulk price multiplier to a catalog snapshot
pub struct PricingAdjuster {
    clock: Arc<dyn Clock>,
}

impl PricingAdjuster {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Multiply every present price by `multiplier`
    ///
    /// Returns the adjusted catalog and a backup of the input. The input is
    /// never modified, so a rejected multiplier leaves nothing to undo.
    pub fn adjust(
        &self,
        catalog: &PricingCatalog,
        multiplier: f64,
    ) -> Result<(PricingCatalog, CatalogBackup)> {
        let multiplier = RateMultiplier::new(multiplier)?;

        let backup = CatalogBackup {
            created_at: self.clock.now(),
            catalog: catalog.clone(),
        };

        let quotes = catalog
            .iter()
            .map(|quote| scale_quote(quote, multiplier))
            .collect::<Result<Vec<_>>>()?;

        Ok((PricingCatalog::from_quotes(quotes)?, backup))
    }
}

fn scale_quote(quote: &PriceQuote, multiplier: RateMultiplier) -> Result<PriceQuote> {
    let scaled = PriceQuote {
        model_name: quote.model_name.clone(),
        input_price: scale(quote.input_price, multiplier),
        output_price: scale(quote.output_price, multiplier),
        cache_write_price: scale(quote.cache_write_price, multiplier),
        cache_read_price: scale(quote.cache_read_price, multiplier),
        metadata: quote.metadata.clone(),
    };

    if scaled.prices().iter().any(|(_, price)| price.is_some_and(|p| !p.is_finite())) {
        return Err(BillingError::InvalidMultiplier(format!(
            "multiplier {} overflows the prices of model '{}'",
            multiplier.value(),
            quote.model_name
        )));
    }

    Ok(scaled)
}

fn scale(price: Option<f64>, multiplier: RateMultiplier) -> Option<f64> {
    price.map(|p| p * multiplier.value())
}
