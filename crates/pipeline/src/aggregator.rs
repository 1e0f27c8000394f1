//! Per-frame orchestration
//!
//! One pass per frame: locate candidate faces, drop undersized regions,
//! classify each surviving crop with per-face failure isolation, publish the
//! frame's statistics as one unit, draw overlays, and encode the result.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::counter;
use tracing::{debug, warn};

use emotion_detect::{Emotion, EmotionClassifier, FaceLocator};
use frame_capture::VideoFrame;

use crate::annotate::{self, FaceOverlay};
use crate::config::PipelineConfig;
use crate::encode;
use crate::stats::{EmotionStats, FaceResult, FrameStats};
use crate::PipelineError;

/// Drives the full per-frame pass against injected detector backends.
pub struct FrameAggregator {
    locator: Box<dyn FaceLocator>,
    classifier: Box<dyn EmotionClassifier>,
    stats: Arc<EmotionStats>,
    config: PipelineConfig,
}

impl FrameAggregator {
    pub fn new(
        locator: Box<dyn FaceLocator>,
        classifier: Box<dyn EmotionClassifier>,
        stats: Arc<EmotionStats>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            locator,
            classifier,
            stats,
            config,
        }
    }

    /// Run one frame through the pipeline and return its encoded JPEG.
    ///
    /// A locator failure is fatal and propagates; a classifier failure is
    /// isolated to its face and only logged.
    pub fn process(&mut self, frame: VideoFrame) -> Result<Vec<u8>, PipelineError> {
        let regions = self
            .locator
            .locate(&frame)
            .map_err(PipelineError::Locator)?;

        // Percentage denominator covers everything the locator saw, including
        // regions skipped below.
        let total_faces = regions.len();

        let mut faces = Vec::new();
        let mut counts: Vec<(Emotion, usize)> = Vec::new();
        let mut dominants = Vec::new();
        let mut overlays = Vec::new();

        for (index, region) in regions.iter().enumerate() {
            // Face indices are 1-based over the unfiltered locator order, so
            // a skipped region still consumes its number.
            let face_index = index + 1;

            if region.w < self.config.min_face_size || region.h < self.config.min_face_size {
                debug!(face_index, w = region.w, h = region.h, "skipping undersized face region");
                continue;
            }

            let Some(bounded) = region.clamp_to(frame.width, frame.height) else {
                warn!(face_index, "face region lies outside the frame; skipping");
                continue;
            };
            let Some(crop) = frame.crop(bounded.x, bounded.y, bounded.w, bounded.h) else {
                warn!(face_index, "failed to crop face region; skipping");
                continue;
            };

            let prediction = match self.classifier.classify(&crop) {
                Ok(prediction) => prediction,
                Err(err) => {
                    counter!("pipeline_classifier_failures_total").increment(1);
                    warn!(face_index, error = %err, "emotion classification failed; skipping face");
                    continue;
                }
            };
            let Some(dominant) = prediction.dominant_label() else {
                counter!("pipeline_classifier_failures_total").increment(1);
                warn!(face_index, "classifier returned an empty distribution; skipping face");
                continue;
            };

            match counts.iter_mut().find(|(emotion, _)| *emotion == dominant) {
                Some(entry) => entry.1 += 1,
                None => counts.push((dominant, 1)),
            }
            dominants.push(dominant);
            overlays.push(FaceOverlay {
                region: *region,
                label: format!("Face {face_index}: {dominant}"),
            });
            faces.push(FaceResult {
                region: *region,
                emotions: prediction.scores,
                dominant_emotion: dominant,
            });
        }

        counter!("pipeline_frames_total").increment(1);
        counter!("pipeline_faces_total").increment(dominants.len() as u64);

        let stats = FrameStats {
            faces,
            total_faces,
            emotion_percentages: percentages(&counts, total_faces),
            most_frequent_emotion: most_frequent(&counts),
        };
        self.stats.publish(stats, &dominants);

        let annotated = annotate::draw_overlays(frame, &overlays)?;
        encode::encode_jpeg(&annotated, self.config.jpeg_quality)
    }
}

/// Dominant-label share per label, over the unfiltered locator count.
fn percentages(counts: &[(Emotion, usize)], total_faces: usize) -> HashMap<Emotion, f32> {
    if total_faces == 0 {
        return HashMap::new();
    }
    counts
        .iter()
        .map(|&(emotion, count)| (emotion, count as f32 / total_faces as f32 * 100.0))
        .collect()
}

/// Modal dominant label; ties resolve to the first-encountered label.
fn most_frequent(counts: &[(Emotion, usize)]) -> String {
    let mut best: Option<(Emotion, usize)> = None;
    for &(emotion, count) in counts {
        if best.map_or(true, |(_, current)| count > current) {
            best = Some((emotion, count));
        }
    }
    best.map(|(emotion, _)| emotion.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use emotion_detect::{
        DetectionError, EmotionPrediction, EmotionScores, FaceRegion,
    };

    struct ScriptedLocator {
        regions: VecDeque<Result<Vec<FaceRegion>, DetectionError>>,
    }

    impl ScriptedLocator {
        fn returning(regions: Vec<FaceRegion>) -> Self {
            Self {
                regions: VecDeque::from([Ok(regions)]),
            }
        }

        fn failing() -> Self {
            Self {
                regions: VecDeque::from([Err(DetectionError::Inference("camera fault".into()))]),
            }
        }
    }

    impl FaceLocator for ScriptedLocator {
        fn locate(&mut self, _frame: &VideoFrame) -> Result<Vec<FaceRegion>, DetectionError> {
            self.regions.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    struct ScriptedClassifier {
        results: VecDeque<Result<EmotionPrediction, DetectionError>>,
    }

    impl ScriptedClassifier {
        fn new(results: Vec<Result<EmotionPrediction, DetectionError>>) -> Self {
            Self {
                results: VecDeque::from(results),
            }
        }
    }

    impl EmotionClassifier for ScriptedClassifier {
        fn classify(&mut self, _face: &VideoFrame) -> Result<EmotionPrediction, DetectionError> {
            self.results
                .pop_front()
                .unwrap_or_else(|| Err(DetectionError::Inference("unexpected call".into())))
        }
    }

    fn prediction(pairs: &[(Emotion, f32)]) -> Result<EmotionPrediction, DetectionError> {
        let scores: EmotionScores = pairs.iter().copied().collect();
        let dominant = scores.dominant();
        Ok(EmotionPrediction { scores, dominant })
    }

    fn test_frame() -> VideoFrame {
        VideoFrame::new(vec![40; 640 * 480 * 3], 640, 480, 0)
    }

    fn aggregator(
        locator: ScriptedLocator,
        classifier: ScriptedClassifier,
    ) -> (FrameAggregator, Arc<EmotionStats>) {
        let stats = Arc::new(EmotionStats::new());
        let aggregator = FrameAggregator::new(
            Box::new(locator),
            Box::new(classifier),
            Arc::clone(&stats),
            PipelineConfig::default(),
        );
        (aggregator, stats)
    }

    #[test]
    fn test_two_faces_end_to_end() {
        let locator = ScriptedLocator::returning(vec![
            FaceRegion::new(0, 0, 120, 120),
            FaceRegion::new(200, 0, 120, 120),
        ]);
        let classifier = ScriptedClassifier::new(vec![
            prediction(&[(Emotion::Happy, 80.0), (Emotion::Sad, 20.0)]),
            prediction(&[(Emotion::Happy, 10.0), (Emotion::Sad, 90.0)]),
        ]);
        let (mut aggregator, stats) = aggregator(locator, classifier);

        let jpeg = aggregator.process(test_frame()).unwrap();
        assert!(!jpeg.is_empty());

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_faces, 2);
        assert_eq!(snapshot.faces.len(), 2);
        assert_eq!(
            snapshot.emotion_percentages.get(&Emotion::Happy),
            Some(&50.0)
        );
        assert_eq!(snapshot.emotion_percentages.get(&Emotion::Sad), Some(&50.0));
        // 1-1 tie resolves to the first-encountered dominant label.
        assert_eq!(snapshot.most_frequent_emotion, "happy");
        assert_eq!(
            snapshot.emotion_timeline,
            vec![Emotion::Happy, Emotion::Sad]
        );
    }

    #[test]
    fn test_classifier_failure_is_isolated_to_its_face() {
        let locator = ScriptedLocator::returning(vec![
            FaceRegion::new(0, 0, 120, 120),
            FaceRegion::new(200, 0, 120, 120),
        ]);
        let classifier = ScriptedClassifier::new(vec![
            Err(DetectionError::Inference("bad crop".into())),
            prediction(&[(Emotion::Sad, 90.0)]),
        ]);
        let (mut aggregator, stats) = aggregator(locator, classifier);

        aggregator.process(test_frame()).unwrap();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_faces, 2);
        assert_eq!(snapshot.faces.len(), 1);
        assert_eq!(snapshot.faces[0].dominant_emotion, Emotion::Sad);
        assert_eq!(snapshot.emotion_percentages.get(&Emotion::Sad), Some(&50.0));
        assert_eq!(snapshot.most_frequent_emotion, "sad");
        assert_eq!(snapshot.emotion_timeline, vec![Emotion::Sad]);
    }

    #[test]
    fn test_single_face_failure_leaves_empty_frame_stats() {
        let locator = ScriptedLocator::returning(vec![FaceRegion::new(0, 0, 120, 120)]);
        let classifier =
            ScriptedClassifier::new(vec![Err(DetectionError::Inference("bad crop".into()))]);
        let (mut aggregator, stats) = aggregator(locator, classifier);

        aggregator.process(test_frame()).unwrap();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_faces, 1);
        assert!(snapshot.faces.is_empty());
        assert!(snapshot.emotion_percentages.is_empty());
        assert_eq!(snapshot.most_frequent_emotion, "");
        assert!(snapshot.emotion_timeline.is_empty());
    }

    #[test]
    fn test_undersized_region_counts_but_never_classifies() {
        let locator = ScriptedLocator::returning(vec![
            FaceRegion::new(0, 0, 50, 50),
            FaceRegion::new(200, 0, 120, 120),
        ]);
        // Only the large region may reach the classifier.
        let classifier = ScriptedClassifier::new(vec![prediction(&[(Emotion::Happy, 95.0)])]);
        let (mut aggregator, stats) = aggregator(locator, classifier);

        aggregator.process(test_frame()).unwrap();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_faces, 2);
        assert_eq!(snapshot.faces.len(), 1);
        assert_eq!(
            snapshot.emotion_percentages.get(&Emotion::Happy),
            Some(&50.0)
        );
        assert_eq!(snapshot.emotion_timeline, vec![Emotion::Happy]);
    }

    #[test]
    fn test_empty_frame_produces_empty_statistics() {
        let locator = ScriptedLocator::returning(Vec::new());
        let classifier = ScriptedClassifier::new(Vec::new());
        let (mut aggregator, stats) = aggregator(locator, classifier);

        let jpeg = aggregator.process(test_frame()).unwrap();
        assert!(!jpeg.is_empty());

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_faces, 0);
        assert!(snapshot.emotion_percentages.is_empty());
        assert_eq!(snapshot.most_frequent_emotion, "");
    }

    #[test]
    fn test_locator_failure_is_fatal() {
        let (mut aggregator, stats) =
            aggregator(ScriptedLocator::failing(), ScriptedClassifier::new(Vec::new()));
        let err = aggregator.process(test_frame()).unwrap_err();
        assert!(matches!(err, PipelineError::Locator(_)));
        // Nothing was published for the failed frame.
        assert_eq!(stats.snapshot().total_faces, 0);
    }

    #[test]
    fn test_timeline_accumulates_across_frames() {
        let stats = Arc::new(EmotionStats::new());
        for emotion in [Emotion::Happy, Emotion::Neutral, Emotion::Happy] {
            let mut aggregator = FrameAggregator::new(
                Box::new(ScriptedLocator::returning(vec![FaceRegion::new(
                    0, 0, 120, 120,
                )])),
                Box::new(ScriptedClassifier::new(vec![prediction(&[(emotion, 99.0)])])),
                Arc::clone(&stats),
                PipelineConfig::default(),
            );
            aggregator.process(test_frame()).unwrap();
        }

        assert_eq!(
            stats.snapshot().emotion_timeline,
            vec![Emotion::Happy, Emotion::Neutral, Emotion::Happy]
        );
        assert_eq!(stats.timeline_len(), 3);
    }

    #[test]
    fn test_out_of_bounds_region_is_skipped_but_counted() {
        let locator = ScriptedLocator::returning(vec![FaceRegion::new(700, 500, 120, 120)]);
        let classifier = ScriptedClassifier::new(Vec::new());
        let (mut aggregator, stats) = aggregator(locator, classifier);

        aggregator.process(test_frame()).unwrap();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_faces, 1);
        assert!(snapshot.faces.is_empty());
    }

    #[test]
    fn test_most_frequent_prefers_higher_count_over_order() {
        let counts = vec![(Emotion::Happy, 1), (Emotion::Sad, 2)];
        assert_eq!(most_frequent(&counts), "sad");
        assert_eq!(most_frequent(&[]), "");
    }

    #[test]
    fn test_percentages_use_unfiltered_denominator() {
        let counts = vec![(Emotion::Happy, 1)];
        let result = percentages(&counts, 4);
        assert_eq!(result.get(&Emotion::Happy), Some(&25.0));
        assert!(percentages(&counts, 0).is_empty());
        assert!(percentages(&[], 0).is_empty());
    }
}
