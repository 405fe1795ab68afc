//! Periodic execution of the sampling and report jobs

pub mod reporting;
pub mod sampling;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use reporting::ReportJob;
use sampling::SamplingJob;

/// A unit of scheduled work.
#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &'static str;

    /// Runs one tick. `now` is the tick time.
    async fn run(&self, now: DateTime<Utc>) -> Result<()>;
}

/// Runs `job` every `period` until `cancel` fires. The first tick is immediate.
///
/// Ticks run inline in the spawned task, so they never overlap; ticks that fall
/// due while one is still running are skipped. Cancellation is observed only
/// between ticks: a tick in flight always finishes. A failed or panicking tick
/// is logged and the loop carries on.
pub fn spawn_periodic(
    job: Arc<dyn Job>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(job = job.name(), period_secs = period.as_secs(), "Scheduler started");
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            let now = Utc::now();
            match AssertUnwindSafe(job.run(now)).catch_unwind().await {
                Ok(Ok(())) => debug!(job = job.name(), at = %now, "Tick completed"),
                Ok(Err(e)) => error!(
                    job = job.name(),
                    at = %now,
                    error = format!("{e:#}"),
                    "Tick failed, waiting for the next one"
                ),
                Err(panic) => error!(
                    job = job.name(),
                    at = %now,
                    error = panic_message(panic.as_ref()),
                    "Tick panicked, waiting for the next one"
                ),
            }
        }

        info!(job = job.name(), "Scheduler stopped");
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// The sampling and report schedulers, started at most once.
pub struct Schedulers {
    sampling: Arc<SamplingJob>,
    reporting: Arc<ReportJob>,
    sample_interval: Duration,
    report_interval: Duration,
    cancel: CancellationToken,
    running: Mutex<Option<Vec<JoinHandle<()>>>>,
}

impl Schedulers {
    pub fn new(
        sampling: SamplingJob,
        reporting: ReportJob,
        sample_interval: Duration,
        report_interval: Duration,
    ) -> Self {
        Self {
            sampling: Arc::new(sampling),
            reporting: Arc::new(reporting),
            sample_interval,
            report_interval,
            cancel: CancellationToken::new(),
            running: Mutex::new(None),
        }
    }

    /// Starts both schedulers. Returns `false` when they were already started
    /// (or have been shut down), in which case nothing happens.
    pub async fn trigger(&self) -> bool {
        let mut running = self.running.lock().await;
        if running.is_some() || self.cancel.is_cancelled() {
            debug!("Schedulers already started");
            return false;
        }

        info!("Starting exchange rate and daily report schedulers");
        *running = Some(vec![
            spawn_periodic(
                self.sampling.clone(),
                self.sample_interval,
                self.cancel.child_token(),
            ),
            spawn_periodic(
                self.reporting.clone(),
                self.report_interval,
                self.cancel.child_token(),
            ),
        ]);
        true
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some() && !self.cancel.is_cancelled()
    }

    /// Stops both timers and waits for any tick in flight to finish.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handles = self.running.lock().await.take().unwrap_or_default();
        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                error!(error = %e, "Scheduler task ended abnormally");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingJob {
        started: AtomicUsize,
        completed: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        work: Duration,
        fail: bool,
        panic: bool,
    }

    impl CountingJob {
        fn new(work: Duration, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                work,
                fail,
                ..Default::default()
            })
        }

        fn started(&self) -> usize {
            self.started.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Job for CountingJob {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn run(&self, _now: DateTime<Utc>) -> Result<()> {
            self.started.fetch_add(1, Ordering::SeqCst);
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            if !self.work.is_zero() {
                tokio::time::sleep(self.work).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.completed.fetch_add(1, Ordering::SeqCst);
            if self.panic {
                panic!("window start overflowed");
            }
            if self.fail {
                anyhow::bail!("upstream unavailable");
            }
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_is_immediate_then_periodic() {
        let job = CountingJob::new(Duration::ZERO, false);
        let cancel = CancellationToken::new();
        let handle = spawn_periodic(job.clone(), Duration::from_secs(60), cancel.clone());

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(job.started(), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(job.started(), 2);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(job.started(), 4);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_ticks_do_not_stop_the_loop() {
        let job = CountingJob::new(Duration::ZERO, true);
        let cancel = CancellationToken::new();
        let handle = spawn_periodic(job.clone(), Duration::from_secs(10), cancel.clone());

        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(job.started(), 4);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_ticks_do_not_stop_the_loop() {
        let job = Arc::new(CountingJob {
            panic: true,
            ..Default::default()
        });
        let cancel = CancellationToken::new();
        let handle = spawn_periodic(job.clone(), Duration::from_secs(10), cancel.clone());

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(job.started(), 1);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(job.started(), 2);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[test]
    fn test_panic_message_extraction() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("boom"));
        let literal: Box<dyn Any + Send> = Box::new("bang");
        let other: Box<dyn Any + Send> = Box::new(7_u8);

        assert_eq!(panic_message(owned.as_ref()), "boom");
        assert_eq!(panic_message(literal.as_ref()), "bang");
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_ticks_never_overlap() {
        let job = CountingJob::new(Duration::from_secs(150), false);
        let cancel = CancellationToken::new();
        let handle = spawn_periodic(job.clone(), Duration::from_secs(60), cancel.clone());

        tokio::time::sleep(Duration::from_secs(400)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert!(job.started() >= 2);
        assert_eq!(job.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_lets_tick_in_flight_finish() {
        let job = CountingJob::new(Duration::from_secs(30), false);
        let cancel = CancellationToken::new();
        let handle = spawn_periodic(job.clone(), Duration::from_secs(60), cancel.clone());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(job.completed.load(Ordering::SeqCst), 0);

        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(job.started(), 1);
        assert_eq!(job.completed.load(Ordering::SeqCst), 1);
    }
}
