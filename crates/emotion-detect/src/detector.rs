//! ONNX-backed face locator and emotion classifier

use image::imageops;
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use tracing::{info, warn};

use frame_capture::VideoFrame;

use crate::types::{Emotion, EmotionPrediction, EmotionScores, FaceRegion};
use crate::{DetectionError, DetectorConfig, EmotionClassifier, FaceLocator};

/// Locator model input edge length.
const LOCATOR_INPUT_PX: u32 = 320;

/// Face locator running an ONNX detection model.
///
/// Without a configured model it falls back to a fixed centered candidate
/// region, which keeps camera-less development setups producing frames.
pub struct OnnxFaceLocator {
    confidence_threshold: f32,
    session: Option<Session>,
}

impl OnnxFaceLocator {
    pub fn new(config: &DetectorConfig) -> Result<Self, DetectionError> {
        let session = match &config.face_model_path {
            Some(path) => {
                info!("loading face detection model from {}", path);
                Some(load_session(path)?)
            }
            None => {
                warn!("no face model configured; using heuristic stand-in locator");
                None
            }
        };

        Ok(Self {
            confidence_threshold: config.face_confidence,
            session,
        })
    }
}

impl FaceLocator for OnnxFaceLocator {
    fn locate(&mut self, frame: &VideoFrame) -> Result<Vec<FaceRegion>, DetectionError> {
        if let Some(session) = self.session.as_mut() {
            return locate_with_model(session, self.confidence_threshold, frame);
        }

        // Stand-in: one centered candidate covering 40% x 50% of the frame.
        Ok(vec![FaceRegion::new(
            frame.width * 3 / 10,
            frame.height / 5,
            frame.width * 2 / 5,
            frame.height / 2,
        )])
    }
}

fn locate_with_model(
    session: &mut Session,
    confidence_threshold: f32,
    frame: &VideoFrame,
) -> Result<Vec<FaceRegion>, DetectionError> {
    let input = frame_tensor(frame, LOCATOR_INPUT_PX)?;
    let outputs = session
        .run(ort::inputs![input].map_err(|e| DetectionError::Inference(e.to_string()))?)
        .map_err(|e| DetectionError::Inference(e.to_string()))?;
    let (_, value) = outputs
        .iter()
        .next()
        .ok_or_else(|| DetectionError::Inference("model produced no outputs".to_string()))?;
    let tensor = value
        .try_extract_tensor::<f32>()
        .map_err(|e| DetectionError::Inference(e.to_string()))?;
    let raw: Vec<f32> = tensor.iter().copied().collect();

    // Rows of [score, cx, cy, w, h] in normalized frame coordinates.
    let frame_w = frame.width as f32;
    let frame_h = frame.height as f32;
    let mut regions = Vec::new();
    for det in raw.chunks_exact(5) {
        if det[0] < confidence_threshold {
            continue;
        }
        let w = (det[3] * frame_w).max(0.0);
        let h = (det[4] * frame_h).max(0.0);
        let x = (det[1] * frame_w - w / 2.0).max(0.0);
        let y = (det[2] * frame_h - h / 2.0).max(0.0);
        regions.push(FaceRegion::new(x as u32, y as u32, w as u32, h as u32));
    }
    Ok(regions)
}

/// Emotion classifier running an ONNX expression model over face crops.
pub struct OnnxEmotionClassifier {
    input_px: u32,
    session: Option<Session>,
}

impl OnnxEmotionClassifier {
    pub fn new(config: &DetectorConfig) -> Result<Self, DetectionError> {
        let session = match &config.emotion_model_path {
            Some(path) => {
                info!("loading emotion model from {}", path);
                Some(load_session(path)?)
            }
            None => {
                warn!("no emotion model configured; using heuristic stand-in classifier");
                None
            }
        };

        Ok(Self {
            input_px: config.classifier_input_px,
            session,
        })
    }
}

impl EmotionClassifier for OnnxEmotionClassifier {
    fn classify(&mut self, face: &VideoFrame) -> Result<EmotionPrediction, DetectionError> {
        if let Some(session) = self.session.as_mut() {
            return classify_with_model(session, self.input_px, face);
        }

        // Stand-in: a fixed neutral-leaning distribution, nudged by the crop
        // so consecutive faces do not all read identically. Omits the
        // dominant label so callers exercise their own argmax.
        let center = face
            .get_pixel(face.width / 2, face.height / 2)
            .unwrap_or([128, 128, 128]);
        let tilt = f32::from(center[0]) / 255.0 * 8.0;
        let scores: EmotionScores = [
            (Emotion::Neutral, 50.0 + tilt),
            (Emotion::Happy, 20.0),
            (Emotion::Sad, 10.0),
            (Emotion::Angry, 8.0),
            (Emotion::Surprise, 5.0),
            (Emotion::Fear, 4.0),
            (Emotion::Disgust, 3.0 - tilt.min(3.0)),
        ]
        .into_iter()
        .collect();
        Ok(EmotionPrediction {
            scores,
            dominant: None,
        })
    }
}

fn classify_with_model(
    session: &mut Session,
    input_px: u32,
    face: &VideoFrame,
) -> Result<EmotionPrediction, DetectionError> {
    let input = frame_tensor(face, input_px)?;
    let outputs = session
        .run(ort::inputs![input].map_err(|e| DetectionError::Inference(e.to_string()))?)
        .map_err(|e| DetectionError::Inference(e.to_string()))?;
    let (_, value) = outputs
        .iter()
        .next()
        .ok_or_else(|| DetectionError::Inference("model produced no outputs".to_string()))?;
    let tensor = value
        .try_extract_tensor::<f32>()
        .map_err(|e| DetectionError::Inference(e.to_string()))?;
    let logits: Vec<f32> = tensor.iter().copied().collect();
    if logits.len() < Emotion::ALL.len() {
        return Err(DetectionError::Inference(format!(
            "expected {} emotion logits, got {}",
            Emotion::ALL.len(),
            logits.len()
        )));
    }

    let percentages = softmax(&logits[..Emotion::ALL.len()]);
    let scores: EmotionScores = Emotion::ALL
        .into_iter()
        .zip(percentages.iter().map(|p| p * 100.0))
        .collect();
    let dominant = scores.dominant();
    Ok(EmotionPrediction { scores, dominant })
}

fn load_session(path: &str) -> Result<Session, DetectionError> {
    Session::builder()
        .map_err(|e| DetectionError::ModelLoad(e.to_string()))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| DetectionError::ModelLoad(e.to_string()))?
        .commit_from_file(path)
        .map_err(|e| DetectionError::ModelLoad(format!("{path}: {e}")))
}

/// Resize a frame to `edge` x `edge` and lay it out as a normalized
/// 1x3xHxW tensor.
fn frame_tensor(frame: &VideoFrame, edge: u32) -> Result<Array4<f32>, DetectionError> {
    let img = image::ImageBuffer::<image::Rgb<u8>, _>::from_raw(
        frame.width,
        frame.height,
        frame.data.as_slice(),
    )
    .ok_or_else(|| {
        DetectionError::ImageProcessing("frame buffer does not match its dimensions".to_string())
    })?;
    let resized = imageops::resize(&img, edge, edge, imageops::FilterType::Triangle);

    let mut input = Array4::<f32>::zeros((1, 3, edge as usize, edge as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        input[[0, 0, y as usize, x as usize]] = f32::from(pixel[0]) / 255.0;
        input[[0, 1, y as usize, x as usize]] = f32::from(pixel[1]) / 255.0;
        input[[0, 2, y as usize, x as usize]] = f32::from(pixel[2]) / 255.0;
    }
    Ok(input)
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|v| v / sum).collect()
}
