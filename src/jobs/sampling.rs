use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, instrument};

use super::Job;
use crate::core::detect::{AppendInstruction, detect_changes};
use crate::core::rates::RateSource;
use crate::core::store::RateStore;

/// Fetches the latest rates and records the ones that changed.
pub struct SamplingJob {
    source: Arc<dyn RateSource>,
    store: Arc<dyn RateStore>,
    base: String,
}

impl SamplingJob {
    pub fn new(source: Arc<dyn RateSource>, store: Arc<dyn RateStore>, base: &str) -> Self {
        Self {
            source,
            store,
            base: base.to_string(),
        }
    }

    /// One fetch, detect, append cycle. Every recorded sample is stamped `now`.
    #[instrument(name = "SamplingTick", skip(self), fields(base = %self.base))]
    pub async fn sample(&self, now: DateTime<Utc>) -> Result<Vec<AppendInstruction>> {
        let snapshot = self
            .source
            .fetch_base(&self.base)
            .await
            .with_context(|| format!("Failed to fetch latest rates for base {}", self.base))?;
        info!(rates = ?snapshot.rates, "Fetched latest rates");

        let history = self
            .store
            .load()
            .await
            .with_context(|| format!("Failed to load rate history from {}", self.store.describe()))?;

        let instructions = detect_changes(&history, &snapshot, now);
        if instructions.is_empty() {
            return Ok(instructions);
        }

        self.store
            .append_all(&instructions)
            .await
            .with_context(|| {
                format!(
                    "Failed to record {} rate change(s) at {now} in {}",
                    instructions.len(),
                    self.store.describe()
                )
            })?;
        info!(recorded = instructions.len(), "Recorded rate changes");
        Ok(instructions)
    }
}

#[async_trait]
impl Job for SamplingJob {
    fn name(&self) -> &'static str {
        "exchange-rate-sampling"
    }

    async fn run(&self, now: DateTime<Utc>) -> Result<()> {
        self.sample(now).await.map(|_| ())
    }
}
