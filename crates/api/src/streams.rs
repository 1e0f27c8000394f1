//! Production stream wiring
//!
//! Builds a fresh frame source, detector pair, and aggregator per video
//! stream consumer. Every stream writes into the one shared aggregation
//! state.

use std::sync::Arc;

use emotion_detect::{DetectorConfig, OnnxEmotionClassifier, OnnxFaceLocator};
use frame_capture::{FfmpegSource, FrameSource, SourceConfig, SyntheticSource};
use pipeline::{
    EmotionStats, FrameAggregator, FrameStream, PipelineConfig, PipelineError, StreamOpener,
    StreamPublisher,
};

use crate::config::{AppConfig, SYNTHETIC_DEVICE};

/// Opens camera-backed pipelines for the video feed endpoint.
pub struct CameraStreams {
    source: SourceConfig,
    detectors: DetectorConfig,
    pipeline: PipelineConfig,
    stats: Arc<EmotionStats>,
}

impl CameraStreams {
    pub fn new(config: &AppConfig, stats: Arc<EmotionStats>) -> Self {
        Self {
            source: SourceConfig {
                device: config.device.clone(),
                width: config.capture_width,
                height: config.capture_height,
                fps: config.capture_fps,
            },
            detectors: DetectorConfig {
                face_model_path: config.face_model_path.clone(),
                emotion_model_path: config.emotion_model_path.clone(),
                ..DetectorConfig::default()
            },
            pipeline: PipelineConfig {
                min_face_size: config.min_face_size,
                jpeg_quality: config.jpeg_quality,
            },
            stats,
        }
    }
}

impl StreamOpener for CameraStreams {
    fn open(&self) -> Result<FrameStream, PipelineError> {
        let source: Box<dyn FrameSource> = if self.source.device == SYNTHETIC_DEVICE {
            Box::new(SyntheticSource::new(self.source.width, self.source.height))
        } else {
            Box::new(FfmpegSource::open(&self.source)?)
        };

        let locator = OnnxFaceLocator::new(&self.detectors)
            .map_err(|e| PipelineError::Stream(e.to_string()))?;
        let classifier = OnnxEmotionClassifier::new(&self.detectors)
            .map_err(|e| PipelineError::Stream(e.to_string()))?;

        let aggregator = FrameAggregator::new(
            Box::new(locator),
            Box::new(classifier),
            Arc::clone(&self.stats),
            self.pipeline.clone(),
        );
        Ok(StreamPublisher::spawn(source, aggregator))
    }
}
