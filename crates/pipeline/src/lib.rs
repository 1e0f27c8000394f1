//! Face Sentiment Pipeline
//!
//! The per-frame orchestration core:
//! - Frame pass: locate faces, filter undersized regions, classify each face
//!   with isolated failure handling, aggregate statistics, annotate
//! - Shared aggregation state with torn-read-free snapshots
//! - Continuous MJPEG stream production with prompt consumer-disconnect
//!   cancellation

pub mod aggregator;
pub mod annotate;
pub mod config;
pub mod encode;
pub mod publisher;
pub mod stats;

pub use aggregator::FrameAggregator;
pub use config::PipelineConfig;
pub use publisher::{FrameStream, StreamOpener, StreamPublisher, MULTIPART_CONTENT_TYPE};
pub use stats::{EmotionSnapshot, EmotionStats, FaceResult, FrameStats};

use emotion_detect::DetectionError;
use frame_capture::CaptureError;
use thiserror::Error;

/// Pipeline error types
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Fatal to the stream: no frame can be produced without face locations.
    #[error("Face localization failed: {0}")]
    Locator(#[source] DetectionError),

    #[error("Frame annotation failed: {0}")]
    Annotate(String),

    #[error("Frame encoding failed: {0}")]
    Encode(String),

    #[error("Frame source failed: {0}")]
    Source(#[from] CaptureError),

    #[error("Stream unavailable: {0}")]
    Stream(String),
}
