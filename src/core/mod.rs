//! Core business logic abstractions

pub mod config;
pub mod currency;
pub mod detect;
pub mod error;
pub mod history;
pub mod log;
pub mod rates;
pub mod report;
pub mod store;

// Re-export main types for cleaner imports
pub use currency::Currency;
pub use detect::{AppendInstruction, detect_changes};
pub use error::{RateSourceError, StoreError};
pub use history::{CurrencySeries, RateHistory, Sample};
pub use rates::{RateSnapshot, RateSource};
pub use report::derive_report;
pub use store::RateStore;
