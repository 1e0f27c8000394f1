//! Video Feed Route

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Response};
use futures::StreamExt;

use pipeline::MULTIPART_CONTENT_TYPE;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Long-lived multipart MJPEG feed.
///
/// Opens a fresh producer loop for this consumer; disconnecting stops the
/// loop and releases the camera.
pub async fn video_feed(State(state): State<Arc<AppState>>) -> ApiResult<Response<Body>> {
    let stream = state.streams.open()?;

    Response::builder()
        .header(header::CONTENT_TYPE, MULTIPART_CONTENT_TYPE)
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(stream.map(Ok::<_, Infallible>)))
        .map_err(|e| ApiError::Internal(e.to_string()))
}
