use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::config::Config;
use crate::core::stats::ExecutionStatsTracker;

/// /health, /metrics 노출용 경량 HTTP 서버
#[derive(Clone)]
pub struct MonitoringManager {
    config: Arc<Config>,
    tracker: Arc<ExecutionStatsTracker>,
}

impl MonitoringManager {
    pub fn new(config: Arc<Config>, tracker: Arc<ExecutionStatsTracker>) -> Self {
        Self { config, tracker }
    }

    pub async fn start(&self) -> Result<()> {
        let metrics_tracker = Arc::clone(&self.tracker);
        let status_tracker = Arc::clone(&self.tracker);
        let app = Router::new()
            .route("/health", get(|| async { Json(serde_json::json!({"ok": true})) }))
            .route("/metrics", get(move || metrics_handler(Arc::clone(&metrics_tracker))))
            .route("/status", get(move || status_handler(Arc::clone(&status_tracker))));

        let port = self.config.runtime.metrics_port;
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        tracing::info!("📈 Metrics server listening on http://{}", addr);

        tokio::spawn(async move {
            if let Err(e) = axum::Server::bind(&addr).serve(app.into_make_service()).await {
                tracing::error!("Metrics server error: {}", e);
            }
        });
        Ok(())
    }
}

async fn metrics_handler(tracker: Arc<ExecutionStatsTracker>) -> impl IntoResponse {
    Json(tracker.snapshot().await)
}

#[derive(Serialize)]
struct StatusJson {
    uptime_seconds: u64,
    opportunities_received: u64,
    results_published: u64,
    confirmed: u64,
}

async fn status_handler(tracker: Arc<ExecutionStatsTracker>) -> impl IntoResponse {
    let stats = tracker.snapshot().await;
    Json(StatusJson {
        uptime_seconds: tracker.uptime_seconds(),
        opportunities_received: stats.opportunities_received,
        results_published: stats.results_published,
        confirmed: stats.confirmed,
    })
}
