//! Server configuration
//!
//! Defaults overridable through `FACE_SENTIMENT_*` environment variables,
//! e.g. `FACE_SENTIMENT_DEVICE=/dev/video2` or `FACE_SENTIMENT_PORT=9000`.

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Device value selecting the synthetic test-pattern source.
pub const SYNTHETIC_DEVICE: &str = "synthetic";

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Capture device path, index, media file, or "synthetic"
    pub device: String,
    /// Capture width
    pub capture_width: u32,
    /// Capture height
    pub capture_height: u32,
    /// Capture FPS
    pub capture_fps: u32,
    /// Minimum face width/height considered for classification
    pub min_face_size: u32,
    /// Stream JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// ONNX face detection model; heuristic stand-in when unset
    pub face_model_path: Option<String>,
    /// ONNX emotion model; heuristic stand-in when unset
    pub emotion_model_path: Option<String>,
    /// Seconds per replenished request on rate-limited routes
    pub rate_limit_per_second: u64,
    /// Rate limit burst size
    pub rate_limit_burst: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            device: "/dev/video0".to_string(),
            capture_width: 640,
            capture_height: 480,
            capture_fps: 15,
            min_face_size: 100,
            jpeg_quality: 80,
            face_model_path: None,
            emotion_model_path: None,
            rate_limit_per_second: 1,
            rate_limit_burst: 30,
        }
    }
}

impl AppConfig {
    /// Load defaults merged with `FACE_SENTIMENT_*` environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 8080)?
            .set_default("device", "/dev/video0")?
            .set_default("capture_width", 640)?
            .set_default("capture_height", 480)?
            .set_default("capture_fps", 15)?
            .set_default("min_face_size", 100)?
            .set_default("jpeg_quality", 80)?
            .set_default("rate_limit_per_second", 1)?
            .set_default("rate_limit_burst", 30)?
            .add_source(Environment::with_prefix("FACE_SENTIMENT").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Socket address string for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_yields_defaults() {
        let config = AppConfig::load().unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.min_face_size, 100);
        assert_eq!(config.face_model_path, None);
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }
}
