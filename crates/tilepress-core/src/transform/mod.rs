//! Geometric transforms: quarter-turn rotation, mirroring and ratio crop.
//!
//! # Transform Order
//!
//! A transform is applied in this order:
//! 1. Horizontal and vertical flip
//! 2. Clockwise rotation
//! 3. Centered crop to the requested aspect ratio
//!
//! Steps 1 and 2 fold into a single [`Orientation`](crate::source::Orientation)
//! and step 3 into the draw's placement, so the whole transform is one
//! scheduled draw and encode.
//!
//! # Coordinate System
//!
//! - The crop is computed in the rotated image's pixel space
//! - EXIF orientation is already applied to the source before any of this

mod crop;
mod rotation;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

pub use crop::{canvas_size, centered_crop, CropRatio};
pub use rotation::{compose, Rotation};

use crate::encode::OutputKind;
use crate::error::{PipelineError, PipelineStage};
use crate::geometry::Size;
use crate::scheduler::SurfaceScheduler;
use crate::source::{ImageSource, Orientation, RasterHandle};
use crate::surface::{EncodeRequest, EncodeResult};

/// Rejected transform parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("Invalid crop ratio: {0}")]
    InvalidRatio(String),

    #[error("Rotation must be a multiple of 90 degrees, got {0}")]
    InvalidRotation(i32),
}

/// What to do to the image and how to encode the result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformOptions {
    pub rotation: Rotation,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub crop: CropRatio,
    pub kind: OutputKind,
    /// Ignored for lossless output.
    pub quality: f32,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            rotation: Rotation::None,
            flip_horizontal: false,
            flip_vertical: false,
            crop: CropRatio::Free,
            kind: OutputKind::Photographic,
            quality: 0.9,
        }
    }
}

impl TransformOptions {
    /// Single orientation equivalent to the flips and the rotation.
    pub fn orientation(&self) -> Orientation {
        compose(self.rotation, self.flip_horizontal, self.flip_vertical)
    }

    /// True when the output is the input, pixel for pixel.
    pub fn is_identity(&self) -> bool {
        self.orientation() == Orientation::Normal && self.crop == CropRatio::Free
    }

    pub fn effective_quality(&self) -> f32 {
        if self.kind.is_lossless() {
            1.0
        } else {
            self.quality.clamp(0.0, 1.0)
        }
    }
}

/// Flip, rotate and crop the image behind `handle`, then encode it.
pub async fn apply_transform<I>(
    source: &I,
    scheduler: &SurfaceScheduler,
    handle: &RasterHandle,
    options: &TransformOptions,
) -> Result<EncodeResult, PipelineError>
where
    I: ImageSource + ?Sized,
{
    options.crop.validate()?;
    let image = source.resolve_dimensions(handle)?;

    let orientation = options.orientation();
    let (width, height) = orientation.apply_to_dimensions(image.width, image.height);
    let rotated = Size::new(width, height);
    let canvas = canvas_size(image, options.rotation, options.crop);
    let crop = centered_crop(rotated, canvas);

    let request = EncodeRequest::oriented_crop(
        handle,
        image,
        orientation,
        crop,
        options.effective_quality(),
        options.kind,
    );

    let result = scheduler
        .submit(request)
        .await
        .map_err(|e| PipelineError::from_submit(PipelineStage::Transform, e))?;

    info!(
        %handle,
        rotation = %options.rotation,
        crop = %options.crop,
        ?orientation,
        width = result.size.width,
        height = result.size.height,
        bytes = ?result.byte_len,
        "transform.done"
    );
    Ok(result)
}
