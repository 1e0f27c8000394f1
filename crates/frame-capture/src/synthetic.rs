//! Synthetic test-pattern source
//!
//! Deterministic frame generator for development machines without a camera
//! and for tests that need a real `FrameSource` with a known end.

use tracing::debug;

use crate::frame::VideoFrame;
use crate::{CaptureError, FrameSource};

/// Generates a scrolling gradient pattern, one frame per pull.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    sequence: u32,
    remaining: Option<u64>,
    closed: bool,
}

impl SyntheticSource {
    /// Endless pattern source.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            sequence: 0,
            remaining: None,
            closed: false,
        }
    }

    /// Pattern source that ends after `frames` pulls.
    pub fn with_frame_limit(width: u32, height: u32, frames: u64) -> Self {
        Self {
            remaining: Some(frames),
            ..Self::new(width, height)
        }
    }

    fn render(&self) -> Vec<u8> {
        let phase = self.sequence as u32;
        let mut data = Vec::with_capacity((self.width * self.height * 3) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                data.push(((x + phase) % 256) as u8);
                data.push((y % 256) as u8);
                data.push(((x + y + phase) % 256) as u8);
            }
        }
        data
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CaptureError> {
        if self.closed {
            return Ok(None);
        }
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return Ok(None);
            }
            *remaining -= 1;
        }
        let frame = VideoFrame::new(self.render(), self.width, self.height, self.sequence);
        self.sequence = self.sequence.wrapping_add(1);
        Ok(Some(frame))
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            debug!(frames = self.sequence, "synthetic frame source closed");
        }
    }
}
