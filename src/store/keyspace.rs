use crate::core::currency::Currency;
use crate::core::detect::AppendInstruction;
use crate::core::error::StoreError;
use crate::core::history::{RateHistory, Sample};
use crate::core::store::RateStore;
use anyhow::Result;
use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

const PARTITION: &str = "samples";

/// Rate history in an embedded LSM keyspace, one entry per sample.
///
/// Keys are `<CODE>/<sequence>` with a zero-padded sequence so that a prefix
/// scan returns a series in append order. A cycle's samples are committed in
/// one batch.
pub struct KeyspaceStore {
    path: PathBuf,
    keyspace: Keyspace,
    samples: PartitionHandle,
    write_lock: Mutex<()>,
}

fn sample_key(currency: Currency, sequence: u64) -> String {
    format!("{}/{sequence:020}", currency.code())
}

fn series_prefix(currency: Currency) -> String {
    format!("{}/", currency.code())
}

impl KeyspaceStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)?;

        let keyspace = fjall::Config::new(path).open()?;
        let samples = keyspace.open_partition(PARTITION, PartitionCreateOptions::default())?;
        Ok(Self {
            path: path.to_path_buf(),
            keyspace,
            samples,
            write_lock: Mutex::new(()),
        })
    }

    fn corrupt(&self, reason: impl Into<String>) -> StoreError {
        StoreError::Corrupt {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }

    fn persistence(&self, reason: impl Into<String>) -> StoreError {
        StoreError::Persistence {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }

    fn next_sequence(&self, currency: Currency) -> Result<u64, StoreError> {
        let Some(entry) = self.samples.prefix(series_prefix(currency)).next_back() else {
            return Ok(0);
        };
        let (key, _) = entry.map_err(|e| self.corrupt(e.to_string()))?;
        let key = std::str::from_utf8(&key).map_err(|e| self.corrupt(e.to_string()))?;
        key.rsplit('/')
            .next()
            .and_then(|seq| seq.parse::<u64>().ok())
            .map(|seq| seq + 1)
            .ok_or_else(|| self.corrupt(format!("Malformed sample key: {key}")))
    }
}

#[async_trait]
impl RateStore for KeyspaceStore {
    async fn load(&self) -> Result<RateHistory, StoreError> {
        let mut history = RateHistory::new();
        for currency in Currency::ALL {
            for entry in self.samples.prefix(series_prefix(currency)) {
                let (_, value) = entry.map_err(|e| self.corrupt(e.to_string()))?;
                let sample: Sample =
                    serde_json::from_slice(&value).map_err(|e| self.corrupt(e.to_string()))?;
                history.push(currency, sample);
            }
        }
        debug!(samples = history.len(), "Loaded history from keyspace");
        Ok(history)
    }

    async fn append(&self, currency: Currency, sample: Sample) -> Result<(), StoreError> {
        self.append_all(&[AppendInstruction { currency, sample }])
            .await
    }

    async fn append_all(&self, instructions: &[AppendInstruction]) -> Result<(), StoreError> {
        if instructions.is_empty() {
            return Ok(());
        }

        let _guard = self.write_lock.lock().await;
        let mut sequences: HashMap<Currency, u64> = HashMap::new();
        let mut batch = self.keyspace.batch();

        for instruction in instructions {
            let sequence = match sequences.get(&instruction.currency) {
                Some(seq) => *seq,
                None => self.next_sequence(instruction.currency)?,
            };
            sequences.insert(instruction.currency, sequence + 1);

            let value = serde_json::to_vec(&instruction.sample)
                .map_err(|e| self.persistence(e.to_string()))?;
            batch.insert(
                &self.samples,
                sample_key(instruction.currency, sequence).into_bytes(),
                value,
            );
        }

        batch
            .commit()
            .map_err(|e| self.persistence(e.to_string()))?;
        self.keyspace
            .persist(PersistMode::SyncAll)
            .map_err(|e| self.persistence(e.to_string()))?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("keyspace:{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::tempdir;

    fn sample(hours: i64, value: f64) -> Sample {
        let base = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        Sample::new(base + Duration::hours(hours), value)
    }

    #[tokio::test]
    async fn test_keyspace_append_and_load() {
        let dir = tempdir().unwrap();
        let store = KeyspaceStore::open(dir.path()).unwrap();

        assert!(store.load().await.unwrap().is_empty());

        store.append(Currency::Usd, sample(0, 1.08)).await.unwrap();
        store.append(Currency::Eur, sample(0, 1.0)).await.unwrap();
        store.append(Currency::Usd, sample(2, 1.09)).await.unwrap();

        let history = store.load().await.unwrap();
        assert_eq!(
            history.series(Currency::Usd).unwrap(),
            &[sample(0, 1.08), sample(2, 1.09)]
        );
        assert_eq!(history.series(Currency::Eur).unwrap(), &[sample(0, 1.0)]);
    }

    #[tokio::test]
    async fn test_keyspace_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = KeyspaceStore::open(dir.path()).unwrap();
            store.append(Currency::Eur, sample(0, 1.23)).await.unwrap();
        }

        let reopened = KeyspaceStore::open(dir.path()).unwrap();
        assert_eq!(
            reopened.load().await.unwrap().series(Currency::Eur).unwrap(),
            &[sample(0, 1.23)]
        );

        // Sequences continue after the last persisted key.
        reopened.append(Currency::Eur, sample(1, 1.24)).await.unwrap();
        assert_eq!(
            reopened.load().await.unwrap().series(Currency::Eur).unwrap(),
            &[sample(0, 1.23), sample(1, 1.24)]
        );
    }

    #[tokio::test]
    async fn test_keyspace_keeps_order_past_ten_samples() {
        let dir = tempdir().unwrap();
        let store = KeyspaceStore::open(dir.path()).unwrap();

        let instructions: Vec<AppendInstruction> = (0..12)
            .map(|i| AppendInstruction {
                currency: Currency::Gbp,
                sample: sample(i, 0.80 + i as f64 / 100.0),
            })
            .collect();
        store.append_all(&instructions).await.unwrap();

        let history = store.load().await.unwrap();
        let series = history.series(Currency::Gbp).unwrap();
        assert_eq!(series.len(), 12);
        assert!(series.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(series[11], sample(11, 0.91));
    }

    #[tokio::test]
    async fn test_keyspace_reports_corrupt_values() {
        let dir = tempdir().unwrap();
        let store = KeyspaceStore::open(dir.path()).unwrap();
        store
            .samples
            .insert(sample_key(Currency::Chf, 0).into_bytes(), b"garbage".to_vec())
            .unwrap();

        assert!(matches!(
            store.load().await,
            Err(StoreError::Corrupt { .. })
        ));
    }
}
