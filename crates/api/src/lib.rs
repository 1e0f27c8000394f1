//! Face Sentiment API Server
//!
//! REST API and MJPEG streaming server around the shared aggregation state.

use axum::{
    extract::State,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tower_governor::GovernorLayer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

pub mod config;
pub mod error;
pub mod rate_limit;
pub mod routes;
pub mod streams;

pub use config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use streams::CameraStreams;

use pipeline::{EmotionStats, StreamOpener};
use rate_limit::{create_governor_config, RateLimitConfig};

/// Application state shared across handlers
pub struct AppState {
    /// Shared aggregation state written by the producer loops
    pub stats: Arc<EmotionStats>,
    /// Opens a fresh producer loop per video stream consumer
    pub streams: Arc<dyn StreamOpener>,
    /// Prometheus exposition handle
    pub metrics: PrometheusHandle,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(
        stats: Arc<EmotionStats>,
        streams: Arc<dyn StreamOpener>,
        metrics: PrometheusHandle,
    ) -> Self {
        Self {
            stats,
            streams,
            metrics,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub metrics: PipelineMetrics,
}

/// Pipeline counters surfaced on health
#[derive(Debug, Serialize)]
pub struct PipelineMetrics {
    pub faces_in_frame: usize,
    pub timeline_entries: usize,
}

/// Create the application router
///
/// The snapshot/health/metrics routes sit behind per-IP rate limiting; the
/// long-lived stream route is exempt.
pub fn create_router(state: Arc<AppState>, rate: &RateLimitConfig) -> Router {
    let governed = Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/emotions", get(routes::emotions::get_emotion_data))
        .route("/api/v1/metrics", get(metrics_handler))
        .layer(GovernorLayer {
            config: create_governor_config(rate),
        });

    Router::new()
        .route("/api/v1/stream", get(routes::stream::video_feed))
        .merge(governed)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let snapshot = state.stats.snapshot();

    let response = HealthResponse {
        status: "healthy".to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        metrics: PipelineMetrics {
            faces_in_frame: snapshot.faces.len(),
            timeline_entries: snapshot.emotion_timeline.len(),
        },
    };

    Json(response)
}

/// Prometheus exposition handler
async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    state.metrics.render()
}

/// Initialize logging
pub fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Run the server
pub async fn run_server(
    addr: &str,
    state: Arc<AppState>,
    rate: &RateLimitConfig,
) -> anyhow::Result<()> {
    let app = create_router(state, rate);

    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
