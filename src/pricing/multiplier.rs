use crate::error::{BillingError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Positive, finite billing multiplier (1.0 = list price)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct RateMultiplier(f64);

impl RateMultiplier {
    pub const ONE: RateMultiplier = RateMultiplier(1.0);

    pub fn new(value: f64) -> Result<Self> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(BillingError::InvalidMultiplier(format!(
                "multiplier must be a positive finite number, got {}",
                value
            )))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for RateMultiplier {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for RateMultiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.0)
    }
}

impl FromStr for RateMultiplier {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self> {
        let value: f64 = s.trim().parse().map_err(|_| {
            BillingError::InvalidMultiplier(format!("'{}' is not a number", s))
        })?;
        Self::new(value)
    }
}

impl TryFrom<f64> for RateMultiplier {
    type Error = BillingError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<RateMultiplier> for f64 {
    fn from(multiplier: RateMultiplier) -> Self {
        multiplier.0
    }
}

/// Pick the multiplier to bill with
///
/// A present override wins and must itself be valid; an invalid override is
/// an error rather than a silent fallback. A default that is absent or not
/// valid leaves list price (1.0).
pub fn resolve(
    account_override: Option<f64>,
    global_default: Option<f64>,
) -> Result<RateMultiplier> {
    if let Some(value) = account_override {
        return RateMultiplier::new(value).map_err(|_| {
            BillingError::InvalidMultiplier(format!(
                "account override must be a positive finite number, got {}",
                value
            ))
        });
    }

    Ok(global_default
        .and_then(|value| RateMultiplier::new(value).ok())
        .unwrap_or(RateMultiplier::ONE))
}

/// Read-only view of the per-account multiplier store
#[async_trait]
pub trait RateOverrideSource: Send + Sync {
    /// Raw override for the account, unvalidated
    async fn rate_override(&self, account_id: &str) -> Result<Option<f64>>;
}

/// Override store held in memory, typically seeded from configuration
#[derive(Debug, Default)]
pub struct InMemoryOverrides {
    overrides: DashMap<String, f64>,
}

impl InMemoryOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: &HashMap<String, f64>) -> Self {
        let overrides = DashMap::with_capacity(map.len());
        for (account_id, value) in map {
            overrides.insert(account_id.clone(), *value);
        }
        Self { overrides }
    }

    pub fn set(&self, account_id: impl Into<String>, value: f64) {
        self.overrides.insert(account_id.into(), value);
    }

    pub fn remove(&self, account_id: &str) -> Option<f64> {
        self.overrides.remove(account_id).map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

#[async_trait]
impl RateOverrideSource for InMemoryOverrides {
    async fn rate_override(&self, account_id: &str) -> Result<Option<f64>> {
        Ok(self.overrides.get(account_id).map(|entry| *entry.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_precedence() {
        assert_eq!(resolve(Some(2.0), Some(1.5)).unwrap().value(), 2.0);
        assert_eq!(resolve(None, Some(1.5)).unwrap().value(), 1.5);
        assert_eq!(resolve(None, None).unwrap(), RateMultiplier::ONE);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = resolve(Some(bad), Some(1.5)).unwrap_err();
            assert!(matches!(err, BillingError::InvalidMultiplier(_)));
        }
    }

    #[test]
    fn test_invalid_default_falls_back_to_list_price() {
        assert_eq!(resolve(None, Some(0.0)).unwrap(), RateMultiplier::ONE);
        assert_eq!(resolve(None, Some(-2.0)).unwrap(), RateMultiplier::ONE);
    }

    #[test]
    fn test_parse_multiplier() {
        assert_eq!("1.5".parse::<RateMultiplier>().unwrap().value(), 1.5);
        assert_eq!(" 0.8 ".parse::<RateMultiplier>().unwrap().value(), 0.8);
        assert!("abc".parse::<RateMultiplier>().is_err());
        assert!("0".parse::<RateMultiplier>().is_err());
        assert!("-1".parse::<RateMultiplier>().is_err());
        assert!("NaN".parse::<RateMultiplier>().is_err());
    }

    #[test]
    fn test_multiplier_serde() {
        let m: RateMultiplier = serde_json::from_str("2.0").unwrap();
        assert_eq!(m.value(), 2.0);
        assert_eq!(serde_json::to_string(&m).unwrap(), "2.0");
        assert!(serde_json::from_str::<RateMultiplier>("-1.0").is_err());
    }

    #[tokio::test]
    async fn test_in_memory_overrides() {
        let mut seed = HashMap::new();
        seed.insert("key-a".to_string(), 2.0);
        let overrides = InMemoryOverrides::from_map(&seed);
        overrides.set("key-b", 0.5);

        assert_eq!(overrides.rate_override("key-a").await.unwrap(), Some(2.0));
        assert_eq!(overrides.rate_override("key-b").await.unwrap(), Some(0.5));
        assert_eq!(overrides.rate_override("key-c").await.unwrap(), None);

        assert_eq!(overrides.remove("key-a"), Some(2.0));
        assert_eq!(overrides.len(), 1);
    }
}
