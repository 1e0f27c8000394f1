//! Shared aggregation state
//!
//! One process-wide instance holds the most recently completed frame's
//! statistics plus the append-only emotion timeline. The producer loop is the
//! single writer; the statistics endpoint reads concurrently and must never
//! observe fields from two different frames.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use emotion_detect::{Emotion, EmotionScores, FaceRegion};

/// One classified face as exposed to statistics consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceResult {
    #[serde(flatten)]
    pub region: FaceRegion,
    pub emotions: EmotionScores,
    pub dominant_emotion: Emotion,
}

/// Statistics of the most recently completed frame. Replaced as one unit,
/// never merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameStats {
    /// Faces classified this frame, in locator order
    pub faces: Vec<FaceResult>,
    /// All regions the locator reported this frame, including ones skipped
    /// as undersized
    pub total_faces: usize,
    /// Dominant-label share of `total_faces`, percent
    pub emotion_percentages: HashMap<Emotion, f32>,
    /// Modal dominant label this frame; empty when nothing was classified
    pub most_frequent_emotion: String,
}

/// Full read-side view: current frame statistics plus the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionSnapshot {
    pub faces: Vec<FaceResult>,
    pub total_faces: usize,
    pub emotion_percentages: HashMap<Emotion, f32>,
    pub most_frequent_emotion: String,
    pub emotion_timeline: Vec<Emotion>,
}

/// Process-wide aggregation state.
///
/// The per-frame fields live behind a single swapped `Arc`, so a reader gets
/// either the previous frame's bundle or the new one, never a mix. The
/// timeline is append-only and only ever grows.
#[derive(Debug, Default)]
pub struct EmotionStats {
    current: RwLock<Arc<FrameStats>>,
    timeline: RwLock<Vec<Emotion>>,
}

impl EmotionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-writer update: swap in this frame's statistics as one unit and
    /// append its dominant labels to the timeline.
    ///
    /// Called only by the producer loop.
    pub fn publish(&self, stats: FrameStats, dominants: &[Emotion]) {
        let next = Arc::new(stats);
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = next;
        if !dominants.is_empty() {
            self.timeline
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .extend_from_slice(dominants);
        }
    }

    /// Immutable snapshot for concurrent readers. Never blocks longer than
    /// the reference swap and always reflects a fully completed frame.
    pub fn snapshot(&self) -> EmotionSnapshot {
        let current = Arc::clone(
            &self
                .current
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        );
        let emotion_timeline = self
            .timeline
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        EmotionSnapshot {
            faces: current.faces.clone(),
            total_faces: current.total_faces,
            emotion_percentages: current.emotion_percentages.clone(),
            most_frequent_emotion: current.most_frequent_emotion.clone(),
            emotion_timeline,
        }
    }

    /// Timeline length, i.e. the count of successfully classified faces
    /// since process start.
    pub fn timeline_len(&self) -> usize {
        self.timeline
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    fn face(x: u32, dominant: Emotion) -> FaceResult {
        FaceResult {
            region: FaceRegion::new(x, 10, 120, 120),
            emotions: [(dominant, 90.0)].into_iter().collect(),
            dominant_emotion: dominant,
        }
    }

    fn frame_of(dominant: Emotion, count: usize) -> FrameStats {
        FrameStats {
            faces: (0..count).map(|i| face(i as u32 * 130, dominant)).collect(),
            total_faces: count,
            emotion_percentages: [(dominant, 100.0)].into_iter().collect(),
            most_frequent_emotion: dominant.to_string(),
        }
    }

    #[test]
    fn test_initial_snapshot_is_empty() {
        let stats = EmotionStats::new();
        let snapshot = stats.snapshot();
        assert!(snapshot.faces.is_empty());
        assert_eq!(snapshot.total_faces, 0);
        assert!(snapshot.emotion_percentages.is_empty());
        assert_eq!(snapshot.most_frequent_emotion, "");
        assert!(snapshot.emotion_timeline.is_empty());
    }

    #[test]
    fn test_publish_replaces_frame_fields_wholesale() {
        let stats = EmotionStats::new();
        stats.publish(frame_of(Emotion::Happy, 2), &[Emotion::Happy, Emotion::Happy]);
        stats.publish(frame_of(Emotion::Sad, 1), &[Emotion::Sad]);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.faces.len(), 1);
        assert_eq!(snapshot.total_faces, 1);
        assert_eq!(snapshot.most_frequent_emotion, "sad");
        assert_eq!(snapshot.emotion_percentages.get(&Emotion::Happy), None);
    }

    #[test]
    fn test_timeline_is_append_only() {
        let stats = EmotionStats::new();
        stats.publish(frame_of(Emotion::Happy, 1), &[Emotion::Happy]);
        stats.publish(FrameStats::default(), &[]);
        stats.publish(frame_of(Emotion::Sad, 2), &[Emotion::Sad, Emotion::Sad]);

        let snapshot = stats.snapshot();
        assert_eq!(
            snapshot.emotion_timeline,
            vec![Emotion::Happy, Emotion::Sad, Emotion::Sad]
        );
        assert_eq!(stats.timeline_len(), 3);
    }

    #[test]
    fn test_snapshot_serializes_wire_field_names() {
        let stats = EmotionStats::new();
        stats.publish(frame_of(Emotion::Happy, 1), &[Emotion::Happy]);

        let value = serde_json::to_value(stats.snapshot()).unwrap();
        let first = &value["faces"][0];
        assert_eq!(first["x"], 0);
        assert_eq!(first["y"], 10);
        assert_eq!(first["w"], 120);
        assert_eq!(first["h"], 120);
        assert_eq!(first["dominant_emotion"], "happy");
        assert_eq!(first["emotions"]["happy"], 90.0);
        assert_eq!(value["total_faces"], 1);
        assert_eq!(value["emotion_percentages"]["happy"], 100.0);
        assert_eq!(value["most_frequent_emotion"], "happy");
        assert_eq!(value["emotion_timeline"][0], "happy");
    }

    #[test]
    fn test_concurrent_reads_never_observe_torn_frames() {
        let stats = Arc::new(EmotionStats::new());
        let done = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let stats = Arc::clone(&stats);
                let done = Arc::clone(&done);
                thread::spawn(move || {
                    while !done.load(Ordering::Relaxed) {
                        let snapshot = stats.snapshot();
                        // Every published bundle is internally consistent, so
                        // a mixed read would break one of these relations.
                        assert_eq!(snapshot.faces.len(), snapshot.total_faces);
                        if let Some(face) = snapshot.faces.first() {
                            assert_eq!(
                                snapshot.most_frequent_emotion,
                                face.dominant_emotion.to_string()
                            );
                            assert_eq!(
                                snapshot
                                    .emotion_percentages
                                    .get(&face.dominant_emotion)
                                    .copied(),
                                Some(100.0)
                            );
                        }
                    }
                })
            })
            .collect();

        for i in 0..2000 {
            let (emotion, count) = if i % 2 == 0 {
                (Emotion::Happy, 2)
            } else {
                (Emotion::Sad, 3)
            };
            stats.publish(frame_of(emotion, count), &vec![emotion; count]);
        }
        done.store(true, Ordering::Relaxed);

        for reader in readers {
            reader.join().unwrap();
        }
    }
}
