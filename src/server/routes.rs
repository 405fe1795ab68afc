use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use super::AppState;
use super::error::ApiError;
use crate::core::currency::normalize_code;
use crate::core::history::RateHistory;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/rate/{base}/{target}", get(get_rate))
        .route("/report", get(get_history))
        .route("/daily-report", get(get_daily_report))
        .route("/trigger", get(trigger))
        .route("/health", get(health))
}

#[derive(Debug, Serialize)]
struct PairRate {
    base: String,
    target: String,
    rate: f64,
}

fn parse_code(code: &str) -> Result<String, ApiError> {
    normalize_code(code)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid currency code: {code}")))
}

/// 204 when nothing has been recorded yet.
fn document_response(history: Option<RateHistory>) -> Response {
    match history {
        Some(history) if !history.is_empty() => Json(history).into_response(),
        _ => StatusCode::NO_CONTENT.into_response(),
    }
}

/// GET /rate/{base}/{target}: Current rate of `target` in units of `base`.
async fn get_rate(
    State(state): State<Arc<AppState>>,
    Path((base, target)): Path<(String, String)>,
) -> Result<Json<PairRate>, ApiError> {
    let base = parse_code(&base)?;
    let target = parse_code(&target)?;
    debug!(%base, %target, "Reading current exchange rate");

    let rate = state.source.fetch_pair(&base, &target).await?;
    Ok(Json(PairRate { base, target, rate }))
}

/// GET /report: The full recorded history.
async fn get_history(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let history = state.store.load().await?;
    Ok(document_response(Some(history)))
}

/// GET /daily-report: The last generated daily report.
async fn get_daily_report(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let report = state.report.read().await?;
    // An empty report that was written is still a report.
    Ok(match report {
        Some(report) => Json(report).into_response(),
        None => document_response(None),
    })
}

/// GET /trigger: Starts both schedulers; repeated calls are no-ops.
async fn trigger(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let started = state.schedulers.trigger().await;
    Json(json!({
        "started": started,
        "running": state.schedulers.is_running().await,
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
