pub mod exchangerate_api;

use crate::core::config::AppConfig;
use anyhow::Result;
use exchangerate_api::ExchangeRateApiProvider;
use std::time::Duration;

/// Builds the configured rate source.
pub fn rate_source(config: &AppConfig) -> Result<ExchangeRateApiProvider> {
    let api_key = config.provider.resolve_api_key()?;
    ExchangeRateApiProvider::new(
        &config.provider.base_url,
        &api_key,
        Duration::from_secs(config.provider.timeout_secs),
    )
}
