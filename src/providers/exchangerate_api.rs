use anyhow::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::currency::{Currency, normalize_code};
use crate::core::error::RateSourceError;
use crate::core::rates::{RateSnapshot, RateSource};

/// Client for the exchangerate-api.com v6 REST API.
pub struct ExchangeRateApiProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl ExchangeRateApiProvider {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("fxtrack/0.1")
            .timeout(timeout)
            .build()?;
        Ok(ExchangeRateApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }

    async fn request(&self, endpoint: &str) -> Result<ApiResponse, RateSourceError> {
        let url = format!("{}/{}/{}", self.base_url, self.api_key, endpoint);
        // The key is part of the path, keep it out of the logs.
        debug!("Requesting exchange rates from {}/***/{}", self.base_url, endpoint);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RateSourceError::upstream(format!("Request error: {e} for {endpoint}")))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            RateSourceError::upstream(format!("Failed to read response for {endpoint}: {e}"))
        })?;

        let data: ApiResponse = match serde_json::from_str(&text) {
            Ok(data) => data,
            Err(_) if status == StatusCode::NOT_FOUND => {
                return Err(RateSourceError::unknown_code(format!(
                    "HTTP error: {status} for {endpoint}"
                )));
            }
            Err(_) if !status.is_success() => {
                return Err(RateSourceError::upstream(format!(
                    "HTTP error: {status} for {endpoint}"
                )));
            }
            Err(e) => {
                return Err(RateSourceError::upstream(format!(
                    "Failed to parse JSON response for {endpoint}: {e}"
                )));
            }
        };

        if data.result != "success" {
            let error_type = data.error_type.as_deref().unwrap_or("unknown-error");
            let message = format!("Provider error: {error_type} for {endpoint}");
            return Err(match error_type {
                "unsupported-code" | "malformed-request" => RateSourceError::unknown_code(message),
                _ => RateSourceError::upstream(message),
            });
        }

        if !status.is_success() {
            return Err(RateSourceError::upstream(format!(
                "HTTP error: {status} for {endpoint}"
            )));
        }

        Ok(data)
    }
}

fn checked_code(code: &str) -> Result<String, RateSourceError> {
    normalize_code(code)
        .ok_or_else(|| RateSourceError::unknown_code(format!("Invalid currency code: {code}")))
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    result: String,
    #[serde(default)]
    base_code: Option<String>,
    #[serde(default)]
    conversion_rates: Option<HashMap<String, Option<f64>>>,
    #[serde(default)]
    conversion_rate: Option<f64>,
    #[serde(rename = "error-type", default)]
    error_type: Option<String>,
}

impl ApiResponse {
    fn into_snapshot(self, requested_base: String) -> RateSnapshot {
        let mut snapshot = RateSnapshot::new(self.base_code.unwrap_or(requested_base));
        snapshot.pair_rate = self.conversion_rate;
        for (code, value) in self.conversion_rates.unwrap_or_default() {
            let (Ok(currency), Some(value)) = (code.parse::<Currency>(), value) else {
                continue;
            };
            snapshot.rates.insert(currency, value);
        }
        snapshot
    }
}

#[async_trait]
impl RateSource for ExchangeRateApiProvider {
    #[instrument(name = "LatestRatesFetch", skip(self), fields(base = %base))]
    async fn fetch_base(&self, base: &str) -> Result<RateSnapshot, RateSourceError> {
        let base = checked_code(base)?;
        let data = self.request(&format!("latest/{base}")).await?;
        let snapshot = data.into_snapshot(base);
        debug!(?snapshot, "Received latest rates");
        Ok(snapshot)
    }

    #[instrument(name = "PairRateFetch", skip(self), fields(base = %base, target = %target))]
    async fn fetch_pair(&self, base: &str, target: &str) -> Result<f64, RateSourceError> {
        let base = checked_code(base)?;
        let target = checked_code(target)?;
        let endpoint = format!("pair/{base}/{target}");
        let snapshot = self.request(&endpoint).await?.into_snapshot(base);
        snapshot.pair_rate.ok_or_else(|| {
            RateSourceError::upstream(format!("No conversion rate found for {endpoint}"))
        })
    }
}
