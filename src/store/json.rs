use crate::core::currency::Currency;
use crate::core::detect::AppendInstruction;
use crate::core::error::StoreError;
use crate::core::history::{RateHistory, Sample};
use crate::core::store::RateStore;
use crate::store::document::DocumentFile;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, warn};

struct Cached {
    history: RateHistory,
    /// The last rewrite failed, so memory is ahead of the file.
    dirty: bool,
}

/// Rate history kept in a single JSON file, rewritten whole on every append.
pub struct JsonFileStore {
    document: DocumentFile,
    cached: Mutex<Cached>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            document: DocumentFile::new(path),
            cached: Mutex::new(Cached {
                history: RateHistory::new(),
                dirty: false,
            }),
        }
    }

    async fn current(&self, cached: &mut Cached) -> Result<RateHistory, StoreError> {
        if cached.dirty {
            debug!("Serving unpersisted history from memory");
            return Ok(cached.history.clone());
        }
        let history = self.document.read().await?.unwrap_or_default();
        cached.history = history.clone();
        Ok(history)
    }
}

#[async_trait]
impl RateStore for JsonFileStore {
    async fn load(&self) -> Result<RateHistory, StoreError> {
        let mut cached = self.cached.lock().await;
        self.current(&mut cached).await
    }

    async fn append(&self, currency: Currency, sample: Sample) -> Result<(), StoreError> {
        self.append_all(&[AppendInstruction { currency, sample }])
            .await
    }

    async fn append_all(&self, instructions: &[AppendInstruction]) -> Result<(), StoreError> {
        if instructions.is_empty() {
            return Ok(());
        }

        let mut cached = self.cached.lock().await;
        let mut history = self.current(&mut cached).await?;
        for instruction in instructions {
            history.push(instruction.currency, instruction.sample);
        }

        let result = self.document.write(&history).await;
        cached.history = history;
        cached.dirty = result.is_err();
        if result.is_err() {
            warn!(
                path = %self.document.path().display(),
                "Keeping history in memory until the next successful rewrite"
            );
        }
        result
    }

    fn describe(&self) -> String {
        format!("json:{}", self.document.path().display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::tempdir;

    fn sample(minutes: i64, value: f64) -> Sample {
        let base = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        Sample::new(base + Duration::minutes(minutes), value)
    }

    #[tokio::test]
    async fn test_load_without_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("store.json"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_then_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = JsonFileStore::new(&path);

        store.append(Currency::Eur, sample(0, 1.0)).await.unwrap();
        store
            .append_all(&[
                AppendInstruction {
                    currency: Currency::Usd,
                    sample: sample(120, 1.0853),
                },
                AppendInstruction {
                    currency: Currency::Eur,
                    sample: sample(120, 1.0),
                },
            ])
            .await
            .unwrap();

        // A fresh instance only sees what reached the disk.
        let reloaded = JsonFileStore::new(&path).load().await.unwrap();
        assert_eq!(reloaded, store.load().await.unwrap());
        assert_eq!(
            reloaded.series(Currency::Eur).unwrap(),
            &[sample(0, 1.0), sample(120, 1.0)]
        );
        assert_eq!(
            reloaded.series(Currency::Usd).unwrap(),
            &[sample(120, 1.0853)]
        );
    }

    #[tokio::test]
    async fn test_corrupt_file_fails_load_and_append() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = JsonFileStore::new(&path);

        assert!(matches!(
            store.load().await,
            Err(StoreError::Corrupt { .. })
        ));
        assert!(store.append(Currency::Gbp, sample(0, 0.85)).await.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_history_in_memory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        // A directory squatting on the temp name makes the rewrite fail.
        let blocker = dir.path().join("store.json.tmp");
        std::fs::create_dir(&blocker).unwrap();
        let store = JsonFileStore::new(&path);

        let result = store.append(Currency::Chf, sample(0, 0.97)).await;
        assert!(matches!(result, Err(StoreError::Persistence { .. })));
        assert!(!path.exists());
        assert_eq!(store.load().await.unwrap().len(), 1);

        std::fs::remove_dir(&blocker).unwrap();
        store.append(Currency::Chf, sample(120, 0.98)).await.unwrap();

        let on_disk = JsonFileStore::new(&path).load().await.unwrap();
        assert_eq!(
            on_disk.series(Currency::Chf).unwrap(),
            &[sample(0, 0.97), sample(120, 0.98)]
        );
    }
}
