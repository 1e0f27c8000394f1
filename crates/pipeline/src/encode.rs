//! JPEG encoding of annotated frames

use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

use crate::PipelineError;

/// Encode an annotated frame into a transport-ready JPEG buffer.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, PipelineError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(PipelineError::Encode("empty frame".to_string()));
    }

    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
        .encode_image(image)
        .map_err(|err| PipelineError::Encode(err.to_string()))?;
    Ok(buffer)
}
