//! Pipeline configuration

use serde::{Deserialize, Serialize};

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Minimum face width/height (pixels); smaller regions are skipped
    /// before classification
    pub min_face_size: u32,

    /// JPEG quality for encoded stream frames (1-100)
    pub jpeg_quality: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_face_size: 100,
            jpeg_quality: 80,
        }
    }
}
