//! Emotion labels, score distributions, and face geometry

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Emotion label set produced by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    Neutral,
}

impl Emotion {
    /// Canonical label order; argmax ties resolve to the earliest entry.
    pub const ALL: [Emotion; 7] = [
        Emotion::Angry,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Surprise,
        Emotion::Neutral,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Emotion::Angry => "angry",
            Emotion::Disgust => "disgust",
            Emotion::Fear => "fear",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Surprise => "surprise",
            Emotion::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Emotion label -> probability value in percent.
///
/// Values carry classifier-internal percentage semantics and are not
/// guaranteed to sum to exactly 100.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmotionScores(HashMap<Emotion, f32>);

impl EmotionScores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, emotion: Emotion, value: f32) {
        self.0.insert(emotion, value);
    }

    pub fn get(&self, emotion: Emotion) -> f32 {
        self.0.get(&emotion).copied().unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Highest-valued label, scanning the canonical order so equal values
    /// resolve to the earliest label. `None` for an empty distribution.
    pub fn dominant(&self) -> Option<Emotion> {
        let mut best: Option<(Emotion, f32)> = None;
        for emotion in Emotion::ALL {
            let Some(&value) = self.0.get(&emotion) else {
                continue;
            };
            match best {
                Some((_, current)) if value <= current => {}
                _ => best = Some((emotion, value)),
            }
        }
        best.map(|(emotion, _)| emotion)
    }
}

impl FromIterator<(Emotion, f32)> for EmotionScores {
    fn from_iter<I: IntoIterator<Item = (Emotion, f32)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Axis-aligned face bounding box in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl FaceRegion {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Intersect the region with a `width` x `height` frame. `None` when
    /// nothing of it lies inside the frame.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<FaceRegion> {
        if self.x >= width || self.y >= height {
            return None;
        }
        let w = self.w.min(width - self.x);
        let h = self.h.min(height - self.y);
        if w == 0 || h == 0 {
            return None;
        }
        Some(FaceRegion {
            x: self.x,
            y: self.y,
            w,
            h,
        })
    }
}

/// One classifier result for one face crop.
#[derive(Debug, Clone, PartialEq)]
pub struct EmotionPrediction {
    pub scores: EmotionScores,
    /// Classifier-supplied dominant label, when it reports one.
    pub dominant: Option<Emotion>,
}

impl EmotionPrediction {
    /// The dominant label: classifier-supplied, or computed from the scores.
    pub fn dominant_label(&self) -> Option<Emotion> {
        self.dominant.or_else(|| self.scores.dominant())
    }
}
