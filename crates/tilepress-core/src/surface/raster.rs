//! In-process rasterizer implementing [`RenderSurface`].
//!
//! Decoding, scaling and encoding run on Tokio's blocking pool and complete
//! deterministically, so a scheduler driving this surface can use a zero
//! settling delay. The blocking pool only keeps the CPU work off the async
//! worker; the scheduler still awaits each call, so at most one draw or
//! encode runs at a time.
//!
//! # Drawing
//!
//! 1. Decode the source (EXIF orientation applied)
//! 2. Clip the placement to the canvas
//! 3. Unrotated identity scale: copy only the visible source pixels.
//!    Otherwise: reorient the source region, scale it to the placement
//!    size if needed, then copy the visible part
//! 4. Pixels of the canvas not covered by the placement keep the background

use async_trait::async_trait;
use image::imageops;
use image::{DynamicImage, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use tokio::task;
use tracing::debug;

use super::{DrawCommand, EncodedBuffer, RenderSurface, SurfaceError};
use crate::decode::decode_handle;
use crate::encode::{encode_image, OutputKind};
use crate::geometry::Size;
use crate::source::Orientation;

/// Interpolation filter used when a draw scales its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScaleFilter {
    /// Nearest neighbor interpolation (fastest, lowest quality).
    Nearest,
    /// Bilinear interpolation (fast, acceptable quality).
    #[default]
    Bilinear,
    /// Lanczos3 interpolation (slower, highest quality).
    Lanczos3,
}

impl ScaleFilter {
    fn to_image_filter(self) -> imageops::FilterType {
        match self {
            ScaleFilter::Nearest => imageops::FilterType::Nearest,
            ScaleFilter::Bilinear => imageops::FilterType::Triangle,
            ScaleFilter::Lanczos3 => imageops::FilterType::Lanczos3,
        }
    }
}

/// A canvas backed by an in-memory RGB buffer.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    canvas: Option<RgbImage>,
    filter: ScaleFilter,
    background: Rgb<u8>,
}

impl Default for RasterSurface {
    fn default() -> Self {
        Self {
            canvas: None,
            filter: ScaleFilter::default(),
            background: Rgb([255, 255, 255]),
        }
    }
}

impl RasterSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: ScaleFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Colour of canvas pixels the draw does not cover.
    pub fn with_background(mut self, background: [u8; 3]) -> Self {
        self.background = Rgb(background);
        self
    }
}

#[async_trait]
impl RenderSurface for RasterSurface {
    async fn draw(&mut self, command: &DrawCommand) -> Result<(), SurfaceError> {
        let command = command.clone();
        let filter = self.filter;
        let background = self.background;

        let canvas = task::spawn_blocking(move || render(&command, filter, background))
            .await
            .map_err(|e| SurfaceError::Draw(format!("render task failed: {}", e)))??;

        self.canvas = Some(canvas);
        Ok(())
    }

    async fn encode(
        &mut self,
        quality: f32,
        kind: OutputKind,
    ) -> Result<EncodedBuffer, SurfaceError> {
        let canvas = self.canvas.take().ok_or(SurfaceError::EmptyCanvas)?;

        let (canvas, encoded) = task::spawn_blocking(move || {
            let encoded = encode_image(&canvas, quality, kind);
            (canvas, encoded)
        })
        .await
        .map_err(|e| SurfaceError::Encode(format!("encode task failed: {}", e)))?;

        self.canvas = Some(canvas);
        let bytes = encoded.map_err(|e| SurfaceError::Encode(e.to_string()))?;
        Ok(EncodedBuffer::from(bytes))
    }
}

fn render(
    command: &DrawCommand,
    filter: ScaleFilter,
    background: Rgb<u8>,
) -> Result<RgbImage, SurfaceError> {
    if command.canvas.is_empty() {
        return Err(SurfaceError::Draw(format!(
            "canvas has empty dimensions ({}x{})",
            command.canvas.width, command.canvas.height
        )));
    }

    let source =
        decode_handle(&command.handle).map_err(|e| SurfaceError::Draw(e.to_string()))?;
    let (src_w, src_h) = source.dimensions();
    let region = command.source;

    if region.size().is_empty() || !region.fits_within(Size::new(src_w, src_h)) {
        return Err(SurfaceError::Draw(format!(
            "source region {}x{}+{}+{} outside image {}x{}",
            region.width, region.height, region.x, region.y, src_w, src_h
        )));
    }

    let mut canvas =
        RgbImage::from_pixel(command.canvas.width, command.canvas.height, background);

    let Some((visible, (off_x, off_y))) = command.placement.clip_to(command.canvas) else {
        debug!("surface.draw nothing visible");
        return Ok(canvas);
    };

    let patch = if command.is_identity_scale() && command.orientation == Orientation::Normal {
        imageops::crop_imm(
            &source,
            region.x + off_x,
            region.y + off_y,
            visible.width,
            visible.height,
        )
        .to_image()
    } else {
        let mut region_pixels =
            imageops::crop_imm(&source, region.x, region.y, region.width, region.height)
                .to_image();
        if command.orientation != Orientation::Normal {
            region_pixels = command
                .orientation
                .apply(DynamicImage::ImageRgb8(region_pixels))
                .into_rgb8();
        }
        let placed = if command.is_identity_scale() {
            region_pixels
        } else {
            imageops::resize(
                &region_pixels,
                command.placement.width,
                command.placement.height,
                filter.to_image_filter(),
            )
        };
        imageops::crop_imm(&placed, off_x, off_y, visible.width, visible.height).to_image()
    };

    imageops::replace(&mut canvas, &patch, visible.x as i64, visible.y as i64);
    Ok(canvas)
}
