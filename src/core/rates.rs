//! Rate source abstraction and the snapshot it produces

use crate::core::currency::Currency;
use crate::core::error::RateSourceError;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// One fetch result for all tracked currencies at a point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateSnapshot {
    pub base: String,
    /// Tracked currencies the source reported this cycle. A currency missing
    /// here was absent or null upstream.
    pub rates: BTreeMap<Currency, f64>,
    pub pair_rate: Option<f64>,
}

impl RateSnapshot {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            ..Default::default()
        }
    }

    pub fn with_rate(mut self, currency: Currency, value: f64) -> Self {
        self.rates.insert(currency, value);
        self
    }

    pub fn rate(&self, currency: Currency) -> Option<f64> {
        self.rates.get(&currency).copied()
    }
}

#[async_trait]
pub trait RateSource: Send + Sync {
    /// Latest rates of every tracked currency relative to `base`.
    async fn fetch_base(&self, base: &str) -> Result<RateSnapshot, RateSourceError>;

    /// Latest rate of `target` in units of `base`.
    async fn fetch_pair(&self, base: &str, target: &str) -> Result<f64, RateSourceError>;
}
