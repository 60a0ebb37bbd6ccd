//! Full-pixel decoding of source images.
//!
//! Used by the in-process surface. Orientation is applied so that pixel
//! coordinates agree with the dimensions an [`ImageSource`] reports.
//!
//! [`ImageSource`]: crate::source::ImageSource

use std::io::Cursor;

use image::{ImageReader, RgbImage};
use thiserror::Error;

use crate::source::{Orientation, RasterHandle, SourceError};

/// Errors that can occur while decoding a source image.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The handle could not be read.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The image file is corrupted or in an unsupported format.
    #[error("Corrupted or incomplete image file: {0}")]
    CorruptedFile(String),
}

/// Decode the image behind `handle` to RGB, in display orientation.
pub fn decode_handle(handle: &RasterHandle) -> Result<RgbImage, DecodeError> {
    let bytes = handle.read()?;
    decode_bytes(&bytes)
}

/// Decode encoded image bytes to RGB, applying EXIF orientation.
pub fn decode_bytes(bytes: &[u8]) -> Result<RgbImage, DecodeError> {
    let orientation = Orientation::read(bytes);

    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?
        .decode()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    Ok(orientation.apply(img).into_rgb8())
}
