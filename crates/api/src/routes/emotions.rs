//! Emotion Statistics Route

use axum::{extract::State, Json};
use std::sync::Arc;

use pipeline::EmotionSnapshot;

use crate::AppState;

/// Get the current aggregation snapshot.
///
/// Returns immediately with whatever the producer last published; never
/// waits for a new frame.
pub async fn get_emotion_data(State(state): State<Arc<AppState>>) -> Json<EmotionSnapshot> {
    Json(state.stats.snapshot())
}
