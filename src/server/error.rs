use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use crate::core::error::{RateSourceError, StoreError};

/// Errors surfaced by the HTTP API.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("bad_request: {0}")]
    BadRequest(String),
    #[error("not_found: {0}")]
    NotFound(String),
    #[error("upstream_error: {0}")]
    Upstream(String),
    #[error("internal_error: {0}")]
    Internal(String),
}

/// Error body; `id` is also logged so a response can be traced to its cause.
#[derive(Debug, Serialize)]
struct ErrorBody {
    id: String,
    code: u16,
    message: String,
    details: Vec<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let id = Uuid::new_v4().to_string();
        error!(error_id = %id, error = %self, "Request failed");

        let body = ErrorBody {
            id,
            code: status.as_u16(),
            message: status.canonical_reason().unwrap_or("Error").to_string(),
            details: vec![detail],
        };
        (status, Json(body)).into_response()
    }
}

impl From<RateSourceError> for ApiError {
    fn from(e: RateSourceError) -> Self {
        if e.is_unknown_code() {
            Self::NotFound(e.message)
        } else {
            Self::Upstream(e.message)
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self::Internal(e.to_string())
    }
}
