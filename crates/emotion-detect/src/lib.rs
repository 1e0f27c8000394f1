//! Emotion Detection
//!
//! External-capability boundaries consumed by the pipeline:
//! - Face localization (frame -> bounding boxes)
//! - Emotion classification (face crop -> emotion distribution)
//!
//! Both are injected behind traits so the orchestration layer stays testable
//! with deterministic fakes. The bundled implementations run ONNX models and
//! fall back to heuristic stand-ins when no model path is configured.

pub mod detector;
pub mod types;

pub use detector::{OnnxEmotionClassifier, OnnxFaceLocator};
pub use types::{Emotion, EmotionPrediction, EmotionScores, FaceRegion};

use frame_capture::VideoFrame;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Detection error types
#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),
}

/// Locates candidate face regions in a full frame.
///
/// A locator failure is fatal to the stream that hit it; no meaningful frame
/// can be produced without face locations.
pub trait FaceLocator: Send {
    fn locate(&mut self, frame: &VideoFrame) -> Result<Vec<FaceRegion>, DetectionError>;
}

/// Classifies the emotional expression of one cropped face.
///
/// Callers treat a failure as per-face and recoverable; one bad crop never
/// aborts the frame.
pub trait EmotionClassifier: Send {
    fn classify(&mut self, face: &VideoFrame) -> Result<EmotionPrediction, DetectionError>;
}

/// Detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Face detection confidence threshold
    pub face_confidence: f32,

    /// Classifier model input edge length (pixels)
    pub classifier_input_px: u32,

    /// Model paths; `None` selects the heuristic stand-in
    pub face_model_path: Option<String>,
    pub emotion_model_path: Option<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            face_confidence: 0.7,
            classifier_input_px: 64,
            face_model_path: None,
            emotion_model_path: None,
        }
    }
}
