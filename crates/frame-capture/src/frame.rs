//! Video frame type and pixel helpers

use chrono::Utc;

/// Decoded RGB video frame
///
/// Owned by exactly one pipeline iteration and discarded after encoding.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (milliseconds since epoch)
    pub timestamp_ms: i64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data, stamped at capture time.
    pub fn new(data: Vec<u8>, width: u32, height: u32, sequence: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp_ms: Utc::now().timestamp_millis(),
            sequence,
        }
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }

    /// Crop a region of the frame. Returns `None` when the region does not
    /// lie fully inside the frame or is empty.
    pub fn crop(&self, x: u32, y: u32, w: u32, h: u32) -> Option<VideoFrame> {
        if w == 0 || h == 0 || x + w > self.width || y + h > self.height {
            return None;
        }

        let mut cropped = Vec::with_capacity((w * h * 3) as usize);
        for row in y..(y + h) {
            let start = ((row * self.width + x) * 3) as usize;
            let end = start + (w * 3) as usize;
            cropped.extend_from_slice(&self.data[start..end]);
        }

        Some(VideoFrame {
            data: cropped,
            width: w,
            height: h,
            timestamp_ms: self.timestamp_ms,
            sequence: self.sequence,
        })
    }
}
