//! Aspect-ratio cropping.
//!
//! The crop is centered on the reoriented image and keeps as much of it as
//! the ratio allows: the longer side (relative to the ratio) is trimmed, the
//! other is kept whole.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Rotation, TransformError};
use crate::geometry::{PixelRect, Size};

/// Output aspect ratio of a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CropRatio {
    /// Keep the whole image.
    #[default]
    Free,
    /// `width:height`, both non-zero.
    Fixed { width: u32, height: u32 },
}

impl CropRatio {
    pub fn fixed(width: u32, height: u32) -> Result<Self, TransformError> {
        let ratio = CropRatio::Fixed { width, height };
        ratio.validate()?;
        Ok(ratio)
    }

    pub fn validate(&self) -> Result<(), TransformError> {
        match *self {
            CropRatio::Fixed { width, height } if width == 0 || height == 0 => {
                Err(TransformError::InvalidRatio(format!("{}:{}", width, height)))
            }
            _ => Ok(()),
        }
    }
}

impl FromStr for CropRatio {
    type Err = TransformError;

    /// Parses `free` or `W:H` (`"1:1"`, `"16:9"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("free") {
            return Ok(CropRatio::Free);
        }

        let invalid = || TransformError::InvalidRatio(s.to_string());
        let (w, h) = s.split_once(':').ok_or_else(invalid)?;
        let width = w.trim().parse::<u32>().map_err(|_| invalid())?;
        let height = h.trim().parse::<u32>().map_err(|_| invalid())?;
        CropRatio::fixed(width, height)
    }
}

impl fmt::Display for CropRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CropRatio::Free => f.write_str("free"),
            CropRatio::Fixed { width, height } => write!(f, "{}:{}", width, height),
        }
    }
}

/// Output canvas of rotating an image of `image` size and cropping it to
/// `ratio`.
///
/// Never larger than the rotated image and never smaller than 1x1.
pub fn canvas_size(image: Size, rotation: Rotation, ratio: CropRatio) -> Size {
    let rotated = if rotation.swaps_dimensions() {
        Size::new(image.height, image.width)
    } else {
        image
    };

    let CropRatio::Fixed { width, height } = ratio else {
        return rotated;
    };
    if width == 0 || height == 0 || rotated.is_empty() {
        return rotated;
    }

    let target = width as f64 / height as f64;
    let current = rotated.width as f64 / rotated.height as f64;

    if current > target {
        let w = (rotated.height as f64 * target).round() as u32;
        Size::new(w.clamp(1, rotated.width), rotated.height)
    } else {
        let h = (rotated.width as f64 / target).round() as u32;
        Size::new(rotated.width, h.clamp(1, rotated.height))
    }
}

/// Centered region of size `canvas` inside the rotated image.
pub fn centered_crop(rotated: Size, canvas: Size) -> PixelRect {
    PixelRect::new(
        rotated.width.saturating_sub(canvas.width) / 2,
        rotated.height.saturating_sub(canvas.height) / 2,
        canvas.width.min(rotated.width),
        canvas.height.min(rotated.height),
    )
}
