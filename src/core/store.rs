//! Durable rate history abstraction

use crate::core::currency::Currency;
use crate::core::detect::AppendInstruction;
use crate::core::error::StoreError;
use crate::core::history::{RateHistory, Sample};
use async_trait::async_trait;

/// Append-only storage for the rate history.
///
/// Implementations persist the whole history after every mutation and reload
/// it before every mutation. They assume a single writer process.
#[async_trait]
pub trait RateStore: Send + Sync {
    /// Reads the durable history. A missing artifact yields an empty history.
    async fn load(&self) -> Result<RateHistory, StoreError>;

    /// Appends one sample to the end of `currency`'s series and persists.
    async fn append(&self, currency: Currency, sample: Sample) -> Result<(), StoreError>;

    /// Applies a whole detection cycle.
    async fn append_all(&self, instructions: &[AppendInstruction]) -> Result<(), StoreError> {
        for instruction in instructions {
            self.append(instruction.currency, instruction.sample).await?;
        }
        Ok(())
    }

    /// Human readable location, used in logs.
    fn describe(&self) -> String;
}
