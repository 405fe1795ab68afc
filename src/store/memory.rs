use crate::core::currency::Currency;
use crate::core::error::StoreError;
use crate::core::history::{RateHistory, Sample};
use crate::core::store::RateStore;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory rate history; nothing survives the process.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<RateHistory>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(history: RateHistory) -> Self {
        Self {
            inner: Mutex::new(history),
        }
    }
}

#[async_trait]
impl RateStore for MemoryStore {
    async fn load(&self) -> Result<RateHistory, StoreError> {
        Ok(self.inner.lock().await.clone())
    }

    async fn append(&self, currency: Currency, sample: Sample) -> Result<(), StoreError> {
        let mut history = self.inner.lock().await;
        debug!(%currency, value = sample.value, "Memory store APPEND");
        history.push(currency, sample);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::detect::AppendInstruction;
    use chrono::Utc;

    #[tokio::test]
    async fn test_memory_store_append_all() {
        let store = MemoryStore::new();
        let now = Utc::now();

        store
            .append_all(&[
                AppendInstruction {
                    currency: Currency::Eur,
                    sample: Sample::new(now, 1.0),
                },
                AppendInstruction {
                    currency: Currency::Chf,
                    sample: Sample::new(now, 0.96),
                },
            ])
            .await
            .unwrap();

        let history = store.load().await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.last(Currency::Chf), Some(&Sample::new(now, 0.96)));
    }
}
