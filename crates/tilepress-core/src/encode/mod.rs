//! Output encoding for the in-process surface.
//!
//! This module provides:
//! - Photographic output: JPEG with a quality setting
//! - Lossless output: PNG or WebP (quality is ignored)
//!
//! Quality is expressed on the engine's `[0.0, 1.0]` scale and mapped to the
//! codec's own scale here.

mod jpeg;
mod png;
mod webp;

use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use jpeg::{encode_jpeg, quality_to_jpeg_scale};
pub use png::encode_png;
pub use webp::encode_webp;

/// Errors that can occur during encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Pixel data length doesn't match expected dimensions
    #[error("Invalid pixel data: expected {expected} bytes (width * height * 3), got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// Width or height is zero
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// The codec rejected the image
    #[error("{format} encoding failed: {message}")]
    EncodingFailed {
        format: &'static str,
        message: String,
    },
}

/// Kind of encoded output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OutputKind {
    /// Lossy, quality-controlled (JPEG).
    #[default]
    Photographic,
    /// Lossless (PNG); quality has no effect.
    Lossless,
    /// Lossless WebP; quality has no effect.
    Webp,
}

impl OutputKind {
    pub fn extension(self) -> &'static str {
        match self {
            OutputKind::Photographic => "jpg",
            OutputKind::Lossless => "png",
            OutputKind::Webp => "webp",
        }
    }

    /// Whether the encoder ignores quality.
    pub fn is_lossless(self) -> bool {
        !matches!(self, OutputKind::Photographic)
    }
}

/// Encode an RGB image as the requested output kind.
pub fn encode_image(
    image: &RgbImage,
    quality: f32,
    kind: OutputKind,
) -> Result<Vec<u8>, EncodeError> {
    let (width, height) = image.dimensions();
    match kind {
        OutputKind::Photographic => {
            encode_jpeg(image.as_raw(), width, height, quality_to_jpeg_scale(quality))
        }
        OutputKind::Lossless => encode_png(image.as_raw(), width, height),
        OutputKind::Webp => encode_webp(image.as_raw(), width, height),
    }
}

pub(crate) fn validate_rgb(pixels: &[u8], width: u32, height: u32) -> Result<(), EncodeError> {
    if width == 0 || height == 0 {
        return Err(EncodeError::InvalidDimensions { width, height });
    }

    let expected = (width as usize) * (height as usize) * 3;
    if pixels.len() != expected {
        return Err(EncodeError::InvalidPixelData {
            expected,
            actual: pixels.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_image_photographic_is_jpeg() {
        let img = RgbImage::from_pixel(16, 16, image::Rgb([200, 100, 50]));
        let bytes = encode_image(&img, 0.8, OutputKind::Photographic).unwrap();
        assert_eq!(&bytes[0..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_encode_image_lossless_is_png() {
        let img = RgbImage::from_pixel(16, 16, image::Rgb([200, 100, 50]));
        let bytes = encode_image(&img, 0.1, OutputKind::Lossless).unwrap();
        assert_eq!(&bytes[0..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn test_encode_image_webp() {
        let img = RgbImage::from_pixel(16, 16, image::Rgb([200, 100, 50]));
        let bytes = encode_image(&img, 0.1, OutputKind::Webp).unwrap();
        assert_eq!(&bytes[8..12], b"WEBP");
    }

    #[test]
    fn test_output_kind_extension() {
        assert_eq!(OutputKind::Photographic.extension(), "jpg");
        assert_eq!(OutputKind::Lossless.extension(), "png");
        assert_eq!(OutputKind::Webp.extension(), "webp");
        assert!(OutputKind::Webp.is_lossless());
        assert!(!OutputKind::Photographic.is_lossless());
    }

    #[test]
    fn test_validate_rgb() {
        assert!(validate_rgb(&[0; 12], 2, 2).is_ok());
        assert!(matches!(
            validate_rgb(&[0; 11], 2, 2),
            Err(EncodeError::InvalidPixelData { expected: 12, actual: 11 })
        ));
        assert!(matches!(
            validate_rgb(&[], 0, 2),
            Err(EncodeError::InvalidDimensions { .. })
        ));
    }
}
