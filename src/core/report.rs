//! Windowed report derivation

use crate::core::history::{RateHistory, window_start};
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

pub const DEFAULT_REPORT_WINDOW_HOURS: i64 = 24;

/// Derives the report for `[now - window, now]` from the full history.
///
/// Samples strictly older than the window start are dropped, and so are
/// samples stamped after `now` (clock skew). Both bounds are kept. The
/// derivation is pure: the same history and `now` always give the same report.
pub fn derive_report(history: &RateHistory, now: DateTime<Utc>, window: Duration) -> RateHistory {
    let report = history.window(now, window);
    debug!(
        from = %window_start(now, window),
        to = %now,
        kept = report.len(),
        dropped = history.len() - report.len(),
        "Derived report window"
    );
    report
}
