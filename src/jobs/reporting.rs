use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{info, instrument};

use super::Job;
use crate::core::history::RateHistory;
use crate::core::report::derive_report;
use crate::core::store::RateStore;
use crate::store::document::DocumentFile;

/// Rewrites the report document with the trailing window of the history.
pub struct ReportJob {
    store: Arc<dyn RateStore>,
    report: DocumentFile,
    window: Duration,
}

impl ReportJob {
    pub fn new(store: Arc<dyn RateStore>, report: DocumentFile, window: Duration) -> Self {
        Self {
            store,
            report,
            window,
        }
    }

    /// Derives and writes the report for `now`. If the history cannot be
    /// loaded the previous report is left as it was.
    #[instrument(name = "ReportTick", skip(self))]
    pub async fn generate(&self, now: DateTime<Utc>) -> Result<RateHistory> {
        let history = self.store.load().await.with_context(|| {
            format!(
                "Failed to load rate history from {} for the daily report",
                self.store.describe()
            )
        })?;

        let report = derive_report(&history, now, self.window);
        self.report.write(&report).await.with_context(|| {
            format!(
                "Failed to write daily report to {}",
                self.report.path().display()
            )
        })?;

        info!(
            samples = report.len(),
            path = %self.report.path().display(),
            "Daily report generated"
        );
        Ok(report)
    }
}

#[async_trait]
impl Job for ReportJob {
    fn name(&self) -> &'static str {
        "daily-report"
    }

    async fn run(&self, now: DateTime<Utc>) -> Result<()> {
        self.generate(now).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::Currency;
    use crate::core::history::Sample;
    use crate::store::json::JsonFileStore;
    use crate::store::memory::MemoryStore;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 11, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_report_keeps_last_day_only() {
        let dir = tempdir().unwrap();
        let mut history = RateHistory::new();
        history.push(Currency::Eur, Sample::new(now() - Duration::hours(48), 0.95));
        history.push(Currency::Eur, Sample::new(now() - Duration::hours(10), 0.96));
        history.push(Currency::Usd, Sample::new(now() - Duration::hours(30), 1.08));
        let store = Arc::new(MemoryStore::with_history(history));
        let report_doc = DocumentFile::new(dir.path().join("daily_report.json"));
        let job = ReportJob::new(store.clone(), report_doc.clone(), Duration::hours(24));

        job.run(now()).await.unwrap();

        let written = report_doc.read().await.unwrap().unwrap();
        assert_eq!(
            written.series(Currency::Eur).unwrap(),
            &[Sample::new(now() - Duration::hours(10), 0.96)]
        );
        assert_eq!(written.series(Currency::Usd), Some(&[][..]));
        // The primary history is never pruned.
        assert_eq!(store.load().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_report_overwrites_previous_report() {
        let dir = tempdir().unwrap();
        let mut history = RateHistory::new();
        history.push(Currency::Gbp, Sample::new(now() - Duration::hours(1), 0.85));
        let store = Arc::new(MemoryStore::with_history(history));
        let report_doc = DocumentFile::new(dir.path().join("daily_report.json"));
        let job = ReportJob::new(store, report_doc.clone(), Duration::hours(24));

        job.generate(now()).await.unwrap();
        let later = job.generate(now() + Duration::hours(24)).await.unwrap();

        assert!(later.is_empty());
        assert_eq!(report_doc.read().await.unwrap(), Some(later));
    }

    #[tokio::test]
    async fn test_load_failure_leaves_previous_report() {
        let dir = tempdir().unwrap();
        let store_path = dir.path().join("store.json");
        std::fs::write(&store_path, "not a document").unwrap();
        let report_doc = DocumentFile::new(dir.path().join("daily_report.json"));
        let mut previous = RateHistory::new();
        previous.push(Currency::Chf, Sample::new(now() - Duration::hours(3), 0.97));
        report_doc.write(&previous).await.unwrap();

        let job = ReportJob::new(
            Arc::new(JsonFileStore::new(&store_path)),
            report_doc.clone(),
            Duration::hours(24),
        );

        assert!(job.run(now()).await.is_err());
        assert_eq!(report_doc.read().await.unwrap(), Some(previous));
    }
}
