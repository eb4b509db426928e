//! Prometheus metrics exporter
//!
//! Exposes the collector over HTTP for Prometheus scraping.

use crate::metrics::collector::StatsCollector;
use crate::metrics::error::{MetricsError, MetricsResult};
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Where `/metrics` gets its values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeMode {
    /// Scan the routers on every request
    OnDemand,

    /// Serve whatever the background poller last recorded
    Recorded,
}

#[derive(Clone)]
struct ExporterState {
    collector: Arc<StatsCollector>,
    mode: ScrapeMode,
}

#[derive(Debug, Serialize)]
pub struct RoutersResponse {
    pub routers: Vec<String>,
    pub count: usize,
}

/// Router serving `metrics_path`, `/health` and `/routers`
pub fn metrics_router(collector: Arc<StatsCollector>, mode: ScrapeMode, metrics_path: &str) -> Router {
    Router::new()
        .route(metrics_path, get(metrics_handler))
        .route("/health", get(health_check))
        .route("/routers", get(list_routers))
        .with_state(ExporterState { collector, mode })
        .layer(TraceLayer::new_for_http())
}

async fn metrics_handler(State(state): State<ExporterState>) -> impl IntoResponse {
    let body = match state.mode {
        ScrapeMode::OnDemand => state.collector.render().await,
        ScrapeMode::Recorded => state.collector.render_recorded(),
    };

    ([(header::CONTENT_TYPE, CONTENT_TYPE)], body)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn list_routers(State(state): State<ExporterState>) -> Json<RoutersResponse> {
    let routers = state.collector.scanner().routers();
    let count = routers.len();

    Json(RoutersResponse { routers, count })
}

pub async fn bind(addr: SocketAddr) -> MetricsResult<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| MetricsError::Bind { addr, source })
}

/// Serve `app` until `shutdown` flips to true, then give in-flight requests
/// `grace` to finish.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: watch::Receiver<bool>,
    grace: Duration,
) -> MetricsResult<()> {
    let mut stop = shutdown.clone();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = stop.wait_for(|stopping| *stopping).await;
        })
        .into_future();

    let mut deadline = shutdown;
    let grace_expired = async move {
        let _ = deadline.wait_for(|stopping| *stopping).await;
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = server => result.map_err(MetricsError::Serve),
        _ = grace_expired => Err(MetricsError::ShutdownTimeout(grace)),
    }
}
