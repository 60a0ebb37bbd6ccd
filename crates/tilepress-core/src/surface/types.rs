//! Request and result types exchanged with a render-encode surface.

use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::encode::OutputKind;
use crate::geometry::{PixelRect, Placement, Size};
use crate::source::{Orientation, RasterHandle};

/// Failures reported by a surface.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// The draw command could not be executed.
    #[error("Draw failed: {0}")]
    Draw(String),

    /// The canvas could not be encoded.
    #[error("Encode failed: {0}")]
    Encode(String),

    /// `encode` was called before any successful `draw`.
    #[error("Encode requested on an empty canvas")]
    EmptyCanvas,
}

/// A single draw command: render `source` of the image, reoriented by
/// `orientation`, at `placement` on a canvas of size `canvas`, clipping
/// anything outside the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    pub handle: RasterHandle,
    pub source: PixelRect,
    /// Rotation and mirroring applied to the source region before placing it.
    pub orientation: Orientation,
    pub placement: Placement,
    pub canvas: Size,
}

impl DrawCommand {
    /// Size of the source region after reorientation.
    pub fn oriented_source(&self) -> Size {
        let (width, height) = self
            .orientation
            .apply_to_dimensions(self.source.width, self.source.height);
        Size::new(width, height)
    }

    /// True when the source region is drawn without scaling.
    pub fn is_identity_scale(&self) -> bool {
        self.oriented_source() == self.placement.size()
    }
}

/// A complete draw + encode request.
///
/// Constructed fresh for every attempt and never mutated after it is
/// submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeRequest {
    pub handle: RasterHandle,
    /// Region of the source image to draw, in source pixels.
    pub source: PixelRect,
    pub orientation: Orientation,
    /// Where the region lands on the canvas, in output pixels.
    pub placement: Placement,
    /// Output canvas size; the encoded image has exactly this size.
    pub canvas: Size,
    /// Encode quality in `[0.0, 1.0]`.
    pub quality: f32,
    pub kind: OutputKind,
}

impl EncodeRequest {
    /// Draw the whole image scaled to `output`.
    pub fn scaled(
        handle: &RasterHandle,
        image: Size,
        output: Size,
        quality: f32,
        kind: OutputKind,
    ) -> Self {
        Self {
            handle: handle.clone(),
            source: PixelRect::full(image),
            orientation: Orientation::Normal,
            placement: Placement::at_origin(output),
            canvas: output,
            quality,
            kind,
        }
    }

    /// Draw the whole image at its own size, shifted so `cell`'s origin lands
    /// on the canvas origin, onto a canvas of `cell`'s size.
    pub fn cropped(
        handle: &RasterHandle,
        image: Size,
        cell: PixelRect,
        quality: f32,
        kind: OutputKind,
    ) -> Self {
        Self::oriented_crop(handle, image, Orientation::Normal, cell, quality, kind)
    }

    /// Like [`cropped`](Self::cropped), but the image is reoriented first and
    /// `crop` is given in the reoriented image's pixel space.
    pub fn oriented_crop(
        handle: &RasterHandle,
        image: Size,
        orientation: Orientation,
        crop: PixelRect,
        quality: f32,
        kind: OutputKind,
    ) -> Self {
        let (width, height) = orientation.apply_to_dimensions(image.width, image.height);
        Self {
            handle: handle.clone(),
            source: PixelRect::full(image),
            orientation,
            placement: Placement::shifted(Size::new(width, height), crop.x, crop.y),
            canvas: crop.size(),
            quality,
            kind,
        }
    }

    pub fn draw_command(&self) -> DrawCommand {
        DrawCommand {
            handle: self.handle.clone(),
            source: self.source,
            orientation: self.orientation,
            placement: self.placement,
            canvas: self.canvas,
        }
    }
}

/// Encoded output as handed back by a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedBuffer {
    /// Bytes held in memory.
    Memory(Arc<[u8]>),
    /// Bytes written to a file by the surface.
    File(PathBuf),
}

impl EncodedBuffer {
    /// Measure the encoded length. Can fail for file-backed buffers.
    pub fn resolve_len(&self) -> std::io::Result<u64> {
        match self {
            EncodedBuffer::Memory(bytes) => Ok(bytes.len() as u64),
            EncodedBuffer::File(path) => std::fs::metadata(path).map(|m| m.len()),
        }
    }

    /// Read the encoded bytes.
    pub fn read(&self) -> std::io::Result<Cow<'_, [u8]>> {
        match self {
            EncodedBuffer::Memory(bytes) => Ok(Cow::Borrowed(&bytes[..])),
            EncodedBuffer::File(path) => std::fs::read(path).map(Cow::Owned),
        }
    }
}

impl From<Vec<u8>> for EncodedBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        EncodedBuffer::Memory(bytes.into())
    }
}

/// Result of one served request.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeResult {
    pub buffer: EncodedBuffer,
    /// Measured byte length; `None` if measuring failed.
    pub byte_len: Option<u64>,
    /// Pixel size of the encoded image.
    pub size: Size,
    pub quality: f32,
    pub kind: OutputKind,
}
