//! Recorded rate history: per-currency ordered sample series

use crate::core::currency::Currency;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single recorded rate at the time it was fetched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Samples for one currency in insertion order, which is also chronological.
pub type CurrencySeries = Vec<Sample>;

/// All recorded series keyed by currency.
///
/// This is both the primary store document and, once windowed, the report
/// document. Series iterate in currency enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateHistory {
    series: BTreeMap<Currency, CurrencySeries>,
}

impl RateHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.series.values().all(Vec::is_empty)
    }

    pub fn series(&self, currency: Currency) -> Option<&[Sample]> {
        self.series.get(&currency).map(Vec::as_slice)
    }

    /// The current known value for `currency`, if it has ever been observed.
    pub fn last(&self, currency: Currency) -> Option<&Sample> {
        self.series.get(&currency).and_then(|s| s.last())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Currency, &[Sample])> {
        self.series.iter().map(|(c, s)| (*c, s.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.series.values().map(Vec::len).sum()
    }

    /// Appends to the end of the series, creating it on first observation.
    pub fn push(&mut self, currency: Currency, sample: Sample) {
        self.series.entry(currency).or_default().push(sample);
    }

    /// Removes every sample of `currency` outside `[from, to]`. Both bounds are
    /// inclusive. Only meant for derived copies; the primary store is never
    /// pruned.
    pub fn prune(&mut self, currency: Currency, from: DateTime<Utc>, to: DateTime<Utc>) {
        if let Some(series) = self.series.get_mut(&currency) {
            series.retain(|s| !(s.timestamp < from || s.timestamp > to));
        }
    }

    /// Copy restricted to the trailing `window` ending at `now`.
    pub fn window(&self, now: DateTime<Utc>, window: Duration) -> RateHistory {
        let mut report = self.clone();
        let from = window_start(now, window);
        for currency in Currency::ALL {
            report.prune(currency, from, now);
        }
        report
    }
}

/// Start of the window ending at `now`, saturating at the earliest
/// representable instant.
pub fn window_start(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    now.checked_sub_signed(window)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
