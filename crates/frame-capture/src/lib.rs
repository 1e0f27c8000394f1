//! Frame Capture Library for the Face Sentiment Pipeline
//!
//! Provides pull-based frame acquisition from a camera or media file.
//! Supports:
//! - V4L2 devices and media files decoded through an ffmpeg child process
//! - A deterministic synthetic test-pattern source for camera-less setups

pub mod ffmpeg;
pub mod frame;
pub mod synthetic;

pub use ffmpeg::FfmpegSource;
pub use frame::VideoFrame;
pub use synthetic::SyntheticSource;

use thiserror::Error;

/// Capture error types
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to open source: {0}")]
    Open(String),

    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Streaming error: {0}")]
    Stream(String),
}

/// A blocking, pull-based sequence of frames.
///
/// `next_frame` suspends the calling loop until a frame is available.
/// `Ok(None)` marks end-of-stream; the owning loop terminates on it and no
/// further frames are produced.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CaptureError>;

    /// Release the underlying device or process. Idempotent.
    fn close(&mut self) {}
}

/// Frame source configuration
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Device path (e.g., "/dev/video0"), device index, or media file path
    pub device: String,
    /// Capture width
    pub width: u32,
    /// Capture height
    pub height: u32,
    /// Target FPS
    pub fps: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            width: 640,
            height: 480,
            fps: 15,
        }
    }
}

impl SourceConfig {
    /// Config for a webcam device
    pub fn device(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Default::default()
        }
    }

    /// Config for a media file input
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            device: path.into(),
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_config_constructors() {
        let cam = SourceConfig::device("/dev/video1");
        assert_eq!(cam.device, "/dev/video1");
        assert_eq!(cam.fps, 15);

        let file = SourceConfig::file("clip.mp4");
        assert_eq!(file.device, "clip.mp4");
        assert_eq!(file.fps, 30);
    }
}
