//! Error types shared by the rate source and the stores

use std::path::PathBuf;
use thiserror::Error;

/// The upstream rate source failed or did not know a currency code.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Rate source error ({http_status}): {message}")]
pub struct RateSourceError {
    pub http_status: u16,
    pub message: String,
}

impl RateSourceError {
    pub fn new(http_status: u16, message: impl Into<String>) -> Self {
        Self {
            http_status,
            message: message.into(),
        }
    }

    /// The provider does not know one of the requested codes.
    pub fn unknown_code(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    /// Transport or provider-side failure.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(502, message)
    }

    pub fn is_unknown_code(&self) -> bool {
        self.http_status == 404
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt document {}: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("Failed to persist {}: {reason}", .path.display())]
    Persistence { path: PathBuf, reason: String },
}
