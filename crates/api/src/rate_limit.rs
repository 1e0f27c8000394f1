//! Rate Limiting Middleware using GCRA Algorithm
//!
//! Per-peer-IP limits on the snapshot and health endpoints via
//! tower_governor. Requires the service to be built with
//! `into_make_service_with_connect_info::<SocketAddr>()` for IP extraction.

use governor::middleware::StateInformationMiddleware;
use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;

/// Governor config with X-RateLimit-* response headers enabled
pub type DefaultGovernorConfig =
    tower_governor::governor::GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

/// Rate limiting configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Seconds per replenished request
    pub per_second: u64,
    /// Burst size (max requests that can be made immediately)
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        // Dashboards poll the snapshot endpoint about once a second.
        Self {
            per_second: 1,
            burst_size: 30,
        }
    }
}

/// Create a rate limiting governor config
pub fn create_governor_config(config: &RateLimitConfig) -> Arc<DefaultGovernorConfig> {
    Arc::new(
        GovernorConfigBuilder::default()
            .per_second(config.per_second)
            .burst_size(config.burst_size)
            .use_headers()
            .finish()
            .expect("invalid rate limit configuration"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_builds() {
        let config = RateLimitConfig::default();
        assert!(config.burst_size > 0);
        create_governor_config(&config);
    }
}
