//! HTTP query surface over the rate source, the history and the report

pub mod error;
pub mod routes;

use anyhow::{Context, Result};
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::core::rates::RateSource;
use crate::core::store::RateStore;
use crate::jobs::Schedulers;
use crate::store::document::DocumentFile;

/// Shared state handed to every route handler.
pub struct AppState {
    pub source: Arc<dyn RateSource>,
    pub store: Arc<dyn RateStore>,
    pub report: DocumentFile,
    pub schedulers: Arc<Schedulers>,
}

pub fn router(state: Arc<AppState>) -> Router {
    routes::routes().with_state(state)
}

/// Serves the API on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = listener.local_addr()?;
    info!("fxtrack listening on http://{addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")
}

pub async fn bind(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))
}
