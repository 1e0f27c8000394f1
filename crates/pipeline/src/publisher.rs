//! Continuous stream production
//!
//! Wraps the per-frame loop into a multipart MJPEG chunk sequence for a
//! long-lived streaming consumer. The loop runs on a blocking worker and
//! pushes through a small bounded channel; dropping the consumer side stops
//! the loop on its next send and releases the frame source.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use metrics::counter;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;

use frame_capture::FrameSource;

use crate::aggregator::FrameAggregator;
use crate::PipelineError;

/// Content type of the multipart video feed.
pub const MULTIPART_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

const CHUNK_HEADER: &[u8] = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";
const CHUNK_TRAILER: &[u8] = b"\r\n\r\n";

/// Bounded depth keeps the producer paced to its consumer.
const CHANNEL_DEPTH: usize = 2;

/// Sequence of encoded multipart chunks for one video stream consumer.
///
/// Dropping the stream disconnects the consumer; the producer loop notices on
/// its next send and shuts down.
pub struct FrameStream {
    rx: mpsc::Receiver<Vec<u8>>,
}

impl Stream for FrameStream {
    type Item = Vec<u8>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

/// Opens a fresh producer loop per streaming consumer. The api crate's
/// handlers depend on this seam so tests can inject deterministic pipelines.
pub trait StreamOpener: Send + Sync {
    fn open(&self) -> Result<FrameStream, PipelineError>;
}

/// Drives a `FrameAggregator` over a `FrameSource` until the source ends, a
/// fatal pipeline error occurs, or the consumer disconnects.
pub struct StreamPublisher;

impl StreamPublisher {
    pub fn spawn(mut source: Box<dyn FrameSource>, mut aggregator: FrameAggregator) -> FrameStream {
        let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
        let stream_id = Uuid::new_v4();
        counter!("pipeline_streams_opened_total").increment(1);

        tokio::task::spawn_blocking(move || {
            info!(%stream_id, "video stream started");
            loop {
                let frame = match source.next_frame() {
                    Ok(Some(frame)) => frame,
                    Ok(None) => {
                        info!(%stream_id, "frame source exhausted");
                        break;
                    }
                    Err(err) => {
                        error!(%stream_id, error = %err, "frame source failed");
                        break;
                    }
                };

                let encoded = match aggregator.process(frame) {
                    Ok(encoded) => encoded,
                    Err(err) => {
                        error!(%stream_id, error = %err, "frame pass failed; terminating stream");
                        break;
                    }
                };

                if tx.blocking_send(multipart_chunk(&encoded)).is_err() {
                    debug!(%stream_id, "stream consumer disconnected");
                    break;
                }
            }
            source.close();
            counter!("pipeline_streams_closed_total").increment(1);
            info!(%stream_id, "video stream ended");
        });

        FrameStream { rx }
    }
}

/// Wrap one encoded frame in its multipart delimiter and content-type header.
pub fn multipart_chunk(jpeg: &[u8]) -> Vec<u8> {
    let mut chunk = Vec::with_capacity(CHUNK_HEADER.len() + jpeg.len() + CHUNK_TRAILER.len());
    chunk.extend_from_slice(CHUNK_HEADER);
    chunk.extend_from_slice(jpeg);
    chunk.extend_from_slice(CHUNK_TRAILER);
    chunk
}
