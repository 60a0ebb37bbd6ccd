//! Image Source capability.
//!
//! Resolves the intrinsic metadata of a [`RasterHandle`]: pixel dimensions
//! (always) and encoded byte size (lazily, may be unavailable). Sources are
//! read-only and can be shared between concurrent pipelines.
//!
//! [`DecodingSource`] is the default implementation. It reads only the
//! image header through the `image` crate and corrects the dimensions for
//! EXIF orientation, so a portrait photo stored sideways reports portrait
//! dimensions.

pub(crate) mod orientation;
mod types;

use std::io::Cursor;

use image::ImageReader;

use crate::geometry::Size;

pub use orientation::Orientation;
pub use types::{is_supported_format, ImageFormatKind, ImageInfo, RasterHandle, SourceError};

/// Read-only access to source image metadata.
pub trait ImageSource: Send + Sync {
    /// Intrinsic width and height in display orientation.
    fn resolve_dimensions(&self, handle: &RasterHandle) -> Result<Size, SourceError>;

    /// Encoded size of the source in bytes.
    fn resolve_byte_size(&self, handle: &RasterHandle) -> Result<u64, SourceError>;

    /// Dimensions plus a best-effort byte size.
    ///
    /// Fails only if the dimensions cannot be resolved; an unavailable byte
    /// size is reported as `None`.
    fn probe(&self, handle: &RasterHandle) -> Result<ImageInfo, SourceError> {
        let size = self.resolve_dimensions(handle)?;
        let byte_size = self.resolve_byte_size(handle).ok();
        Ok(ImageInfo { size, byte_size })
    }
}

/// Image source backed by header decoding of files or in-memory buffers.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodingSource;

impl DecodingSource {
    pub fn new() -> Self {
        Self
    }
}

impl ImageSource for DecodingSource {
    fn resolve_dimensions(&self, handle: &RasterHandle) -> Result<Size, SourceError> {
        let bytes = handle.read()?;
        let (width, height) = read_header_dimensions(&bytes)?;
        let (width, height) = Orientation::read(&bytes).apply_to_dimensions(width, height);

        if width == 0 || height == 0 {
            return Err(SourceError::EmptyImage { width, height });
        }
        Ok(Size::new(width, height))
    }

    fn resolve_byte_size(&self, handle: &RasterHandle) -> Result<u64, SourceError> {
        handle.encoded_len()
    }
}

fn read_header_dimensions(bytes: &[u8]) -> Result<(u32, u32), SourceError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| SourceError::Io(e.to_string()))?
        .into_dimensions()
        .map_err(|e| SourceError::InvalidFormat(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, image::Rgb([10, 20, 30]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_resolve_dimensions_from_memory() {
        let handle = RasterHandle::from_bytes(png_bytes(37, 19));
        let size = DecodingSource.resolve_dimensions(&handle).unwrap();
        assert_eq!(size, Size::new(37, 19));
    }

    #[test]
    fn test_exif_rotated_jpeg_reports_swapped_dimensions() {
        let img = RgbImage::new(40, 20);
        let rotated = orientation::fixtures::jpeg_with_orientation(&img, 6);
        let upright = orientation::fixtures::jpeg_with_orientation(&img, 1);

        let size = DecodingSource
            .resolve_dimensions(&RasterHandle::from_bytes(rotated))
            .unwrap();
        assert_eq!(size, Size::new(20, 40));

        let size = DecodingSource
            .resolve_dimensions(&RasterHandle::from_bytes(upright))
            .unwrap();
        assert_eq!(size, Size::new(40, 20));
    }

    #[test]
    fn test_resolve_byte_size_from_memory() {
        let bytes = png_bytes(8, 8);
        let len = bytes.len() as u64;
        let handle = RasterHandle::from_bytes(bytes);
        assert_eq!(DecodingSource.resolve_byte_size(&handle).unwrap(), len);
    }

    #[test]
    fn test_garbage_is_invalid_format() {
        let handle = RasterHandle::from_bytes(vec![0u8; 64]);
        assert!(matches!(
            DecodingSource.resolve_dimensions(&handle),
            Err(SourceError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let handle = RasterHandle::from_path("/nonexistent/dir/image.jpg");
        assert!(matches!(
            DecodingSource.probe(&handle),
            Err(SourceError::NotFound(_))
        ));
    }

    #[test]
    fn test_probe_reads_both() {
        let bytes = png_bytes(12, 5);
        let len = bytes.len() as u64;
        let info = DecodingSource.probe(&RasterHandle::from_bytes(bytes)).unwrap();
        assert_eq!(info.size, Size::new(12, 5));
        assert_eq!(info.byte_size, Some(len));
    }
}
