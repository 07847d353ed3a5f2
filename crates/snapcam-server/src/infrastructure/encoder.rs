//! JPEG frame encoder backed by the `image` crate.

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use snapcam_core::{EncodeError, Frame, FrameEncoder};

/// Fixed JPEG quality used for every photo.
pub const JPEG_QUALITY: u8 = 95;

/// Encodes packed RGB frames as baseline JPEG.
#[derive(Debug, Clone, Copy)]
pub struct JpegFrameEncoder {
    quality: u8,
}

impl JpegFrameEncoder {
    pub fn new() -> Self {
        Self {
            quality: JPEG_QUALITY,
        }
    }
}

impl Default for JpegFrameEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameEncoder for JpegFrameEncoder {
    fn encode(&self, frame: &Frame) -> Result<Vec<u8>, EncodeError> {
        if frame.is_empty() {
            return Err(EncodeError::Dimensions {
                width: frame.width(),
                height: frame.height(),
                actual: frame.pixels().len(),
            });
        }

        let mut buf = Vec::with_capacity(frame.pixels().len() / 8);
        JpegEncoder::new_with_quality(&mut buf, self.quality)
            .encode(
                frame.pixels(),
                frame.width(),
                frame.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| EncodeError::Codec(e.to_string()))?;

        if buf.is_empty() {
            return Err(EncodeError::NoOutput);
        }
        Ok(buf)
    }

    fn format_name(&self) -> &'static str {
        "jpeg"
    }
}
