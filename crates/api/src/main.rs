//! Face Sentiment Pipeline - Main Entry Point

use std::sync::Arc;

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

use api::rate_limit::RateLimitConfig;
use api::{init_logging, run_server, AppConfig, AppState, CameraStreams};
use pipeline::EmotionStats;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = AppConfig::load().context("failed to load configuration")?;
    info!("=== Face Sentiment Pipeline v{} ===", env!("CARGO_PKG_VERSION"));
    info!(device = %config.device, "starting face sentiment system");

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install metrics recorder")?;

    let stats = Arc::new(EmotionStats::new());
    let streams = Arc::new(CameraStreams::new(&config, Arc::clone(&stats)));
    let state = Arc::new(AppState::new(stats, streams, metrics));

    let rate = RateLimitConfig {
        per_second: config.rate_limit_per_second,
        burst_size: config.rate_limit_burst,
    };
    run_server(&config.bind_addr(), state, &rate).await
}
