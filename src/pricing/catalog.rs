use crate::error::{BillingError, Result};
use crate::pricing::models::PriceQuote;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// One record of the catalog source, before validation
#[derive(Debug, Deserialize)]
struct QuoteRecord {
    #[serde(default)]
    model_name: Option<Value>,
    #[serde(default, alias = "input_price")]
    input_cost_per_token: Option<Value>,
    #[serde(default, alias = "output_price")]
    output_cost_per_token: Option<Value>,
    #[serde(default, alias = "cache_write_price")]
    cache_creation_input_token_cost: Option<Value>,
    #[serde(default, alias = "cache_read_price")]
    cache_read_input_token_cost: Option<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl QuoteRecord {
    fn into_quote(self, index: usize) -> Result<PriceQuote> {
        let model_name = match self.model_name {
            Some(Value::String(name)) if !name.trim().is_empty() => name,
            Some(Value::String(_)) | Some(Value::Null) | None => {
                return Err(BillingError::MalformedCatalog(format!(
                    "record {} has no model_name",
                    index
                )))
            }
            Some(other) => {
                return Err(BillingError::MalformedCatalog(format!(
                    "record {}: model_name must be a string, got {}",
                    index, other
                )))
            }
        };

        let quote = PriceQuote {
            input_price: parse_price(index, &model_name, "input_cost_per_token", self.input_cost_per_token)?,
            output_price: parse_price(index, &model_name, "output_cost_per_token", self.output_cost_per_token)?,
            cache_write_price: parse_price(
                index,
                &model_name,
                "cache_creation_input_token_cost",
                self.cache_creation_input_token_cost,
            )?,
            cache_read_price: parse_price(
                index,
                &model_name,
                "cache_read_input_token_cost",
                self.cache_read_input_token_cost,
            )?,
            metadata: self.extra,
            model_name,
        };

        Ok(quote)
    }
}

fn parse_price(index: usize, model: &str, field: &str, value: Option<Value>) -> Result<Option<f64>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(price) if price.is_finite() && price >= 0.0 => Ok(Some(price)),
            _ => Err(BillingError::MalformedCatalog(format!(
                "record {} ('{}'): {} must be a finite non-negative number, got {}",
                index, model, field, n
            ))),
        },
        Some(other) => Err(BillingError::MalformedCatalog(format!(
            "record {} ('{}'): {} must be a number, got {}",
            index, model, field, other
        ))),
    }
}

/// In-memory table of price quotes keyed by model name
///
/// Source order is preserved so a write-back reproduces the same layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PricingCatalog {
    quotes: Vec<PriceQuote>,
    index: HashMap<String, usize>,
}

impl PricingCatalog {
    /// Parse the durable JSON representation (an array of quote records)
    pub fn from_json(source: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(source)
            .map_err(|e| BillingError::MalformedCatalog(format!("invalid JSON: {}", e)))?;

        let records = match document {
            Value::Array(records) => records,
            other => {
                return Err(BillingError::MalformedCatalog(format!(
                    "expected an array of quote records, got {}",
                    json_type_name(&other)
                )))
            }
        };

        let mut quotes = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            let record: QuoteRecord = serde_json::from_value(record).map_err(|e| {
                BillingError::MalformedCatalog(format!("record {}: {}", index, e))
            })?;
            quotes.push(record.into_quote(index)?);
        }

        Self::from_quotes(quotes)
    }

    /// Build a catalog from already-constructed quotes
    pub fn from_quotes(quotes: Vec<PriceQuote>) -> Result<Self> {
        let mut index = HashMap::with_capacity(quotes.len());

        for (position, quote) in quotes.iter().enumerate() {
            quote.validate()?;
            if index.insert(quote.model_name.clone(), position).is_some() {
                return Err(BillingError::MalformedCatalog(format!(
                    "model '{}' is listed more than once",
                    quote.model_name
                )));
            }
        }

        Ok(Self { quotes, index })
    }

    /// Exact-match lookup by model name
    pub fn lookup(&self, model_name: &str) -> Result<&PriceQuote> {
        self.get(model_name)
            .ok_or_else(|| BillingError::NotFound(format!("no pricing for model '{}'", model_name)))
    }

    pub fn get(&self, model_name: &str) -> Option<&PriceQuote> {
        self.index.get(model_name).map(|&position| &self.quotes[position])
    }

    pub fn contains(&self, model_name: &str) -> bool {
        self.index.contains_key(model_name)
    }

    pub fn quotes(&self) -> &[PriceQuote] {
        &self.quotes
    }

    pub fn iter(&self) -> impl Iterator<Item = &PriceQuote> {
        self.quotes.iter()
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Serialize in the durable format, two-space indented
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Serialize for PricingCatalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.quotes.serialize(serializer)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
