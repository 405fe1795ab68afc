//! Change detection between a fresh snapshot and the recorded history

use crate::core::currency::Currency;
use crate::core::history::{RateHistory, Sample};
use crate::core::rates::RateSnapshot;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// A sample that must be appended to a currency's series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppendInstruction {
    pub currency: Currency,
    pub sample: Sample,
}

/// Decides which tracked currencies changed since their last recorded sample.
///
/// Instructions come back in currency enumeration order, at most one per
/// currency, all stamped with `now`. Values are compared bit for bit.
/// Currencies missing from the snapshot are skipped for this cycle.
pub fn detect_changes(
    history: &RateHistory,
    snapshot: &RateSnapshot,
    now: DateTime<Utc>,
) -> Vec<AppendInstruction> {
    let mut instructions = Vec::new();

    for currency in Currency::ALL {
        let Some(value) = snapshot.rate(currency) else {
            debug!(%currency, "Not reported this cycle, skipping");
            continue;
        };

        match history.last(currency) {
            Some(last) if last.value.to_bits() == value.to_bits() => {
                debug!(%currency, value, "Rate unchanged");
                continue;
            }
            Some(last) => {
                info!(%currency, from = last.value, to = value, "Rate changed");
            }
            None => {
                info!(%currency, value, "First observation");
            }
        }

        instructions.push(AppendInstruction {
            currency,
            sample: Sample::new(now, value),
        });
    }

    if instructions.is_empty() {
        info!("No change in the currency rates");
    }

    instructions
}
