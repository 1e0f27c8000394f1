//! Frame annotation
//!
//! Draws a hollow box around each classified face and a
//! `Face {index}: {dominant}` label above its top-left corner.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use emotion_detect::FaceRegion;
use frame_capture::VideoFrame;

use crate::PipelineError;

const BOX_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
const LABEL_COLOR: Rgb<u8> = Rgb([12, 255, 36]);

/// Label text offset above the face box.
const LABEL_OFFSET_PX: u32 = 10;

/// Glyph cell geometry for the builtin bitmap font.
const GLYPH_WIDTH: i32 = 6;

/// One face overlay: box plus label.
#[derive(Debug, Clone)]
pub struct FaceOverlay {
    pub region: FaceRegion,
    pub label: String,
}

/// Consume the frame and return it as an annotated image buffer.
pub fn draw_overlays(
    frame: VideoFrame,
    overlays: &[FaceOverlay],
) -> Result<RgbImage, PipelineError> {
    let VideoFrame {
        data,
        width,
        height,
        ..
    } = frame;
    let mut image = RgbImage::from_raw(width, height, data).ok_or_else(|| {
        PipelineError::Annotate("frame buffer does not match its dimensions".to_string())
    })?;

    for overlay in overlays {
        let region = overlay.region;
        if region.w == 0 || region.h == 0 {
            continue;
        }
        draw_hollow_rect_mut(
            &mut image,
            Rect::at(region.x as i32, region.y as i32).of_size(region.w, region.h),
            BOX_COLOR,
        );
        let label_y = region.y.saturating_sub(LABEL_OFFSET_PX) as i32;
        draw_label(&mut image, region.x as i32, label_y, &overlay.label, LABEL_COLOR);
    }

    Ok(image)
}

/// Render text with the builtin 5x7 bitmap font, clipped to the image.
fn draw_label(image: &mut RgbImage, mut x: i32, y: i32, text: &str, color: Rgb<u8>) {
    let width = image.width() as i32;
    let height = image.height() as i32;
    for ch in text.chars().flat_map(char::to_uppercase) {
        if let Some(glyph) = glyph_bits(ch) {
            for (row, pattern) in glyph.iter().enumerate() {
                let py = y + row as i32;
                if py < 0 || py >= height {
                    continue;
                }
                for col in 0..5i32 {
                    if (pattern >> (4 - col)) & 1 == 1 {
                        let px = x + col;
                        if px >= 0 && px < width {
                            image.put_pixel(px as u32, py as u32, color);
                        }
                    }
                }
            }
        }
        x += GLYPH_WIDTH;
    }
}

/// 5x7 bitmap glyphs covering the label alphabet: "FACE N:" plus the emotion
/// label set, uppercased.
fn glyph_bits(ch: char) -> Option<[u8; 7]> {
    match ch {
        'A' => Some([0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001]),
        'C' => Some([0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110]),
        'D' => Some([0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110]),
        'E' => Some([0b11111, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000, 0b11111]),
        'F' => Some([0b11111, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000, 0b10000]),
        'G' => Some([0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111]),
        'H' => Some([0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001]),
        'I' => Some([0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110]),
        'L' => Some([0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111]),
        'N' => Some([0b10001, 0b11001, 0b10101, 0b10101, 0b10011, 0b10001, 0b10001]),
        'P' => Some([0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000]),
        'R' => Some([0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001]),
        'S' => Some([0b01111, 0b10000, 0b01110, 0b00001, 0b00001, 0b10001, 0b01110]),
        'T' => Some([0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100]),
        'U' => Some([0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110]),
        'Y' => Some([0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100]),
        '0' => Some([0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110]),
        '1' => Some([0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110]),
        '2' => Some([0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111]),
        '3' => Some([0b11110, 0b00001, 0b00001, 0b01110, 0b00001, 0b00001, 0b11110]),
        '4' => Some([0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010]),
        '5' => Some([0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110]),
        '6' => Some([0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110]),
        '7' => Some([0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000]),
        '8' => Some([0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110]),
        '9' => Some([0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100]),
        ':' => Some([0b00000, 0b00110, 0b00110, 0b00000, 0b00110, 0b00110, 0b00000]),
        ' ' => Some([0, 0, 0, 0, 0, 0, 0]),
        _ => None,
    }
}
