//! Quarter-turn rotation and mirroring.
//!
//! # Composition
//!
//! An edit flips the image first, then rotates it clockwise. Every such
//! combination is one of the eight EXIF orientations, so the result is
//! expressed as an [`Orientation`] and drawn by the surface in one pass:
//!
//! - flipping both axes equals a 180° turn
//! - a vertical flip equals a horizontal flip plus a 180° turn
//! - a horizontal flip followed by `k` clockwise turns equals `-k` turns
//!   followed by a horizontal flip

use std::fmt;

use serde::{Deserialize, Serialize};

use super::TransformError;
use crate::source::Orientation;

/// Clockwise rotation in quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    /// Accepts any multiple of 90, negative meaning counter-clockwise.
    pub fn from_degrees(degrees: i32) -> Result<Self, TransformError> {
        if degrees % 90 != 0 {
            return Err(TransformError::InvalidRotation(degrees));
        }
        Ok(Self::from_quarter_turns(degrees / 90))
    }

    fn from_quarter_turns(turns: i32) -> Self {
        match turns.rem_euclid(4) {
            1 => Rotation::Cw90,
            2 => Rotation::Cw180,
            3 => Rotation::Cw270,
            _ => Rotation::None,
        }
    }

    pub fn quarter_turns(self) -> i32 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 1,
            Rotation::Cw180 => 2,
            Rotation::Cw270 => 3,
        }
    }

    pub fn degrees(self) -> i32 {
        self.quarter_turns() * 90
    }

    /// Add another rotation, wrapping at 360°.
    pub fn then(self, other: Rotation) -> Self {
        Self::from_quarter_turns(self.quarter_turns() + other.quarter_turns())
    }

    pub fn swaps_dimensions(self) -> bool {
        matches!(self, Rotation::Cw90 | Rotation::Cw270)
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Single orientation equivalent to flipping, then rotating.
pub fn compose(rotation: Rotation, flip_horizontal: bool, flip_vertical: bool) -> Orientation {
    let turns = rotation.quarter_turns();
    let (mirrored, turns) = match (flip_horizontal, flip_vertical) {
        (false, false) => (false, turns),
        (true, false) => (true, turns),
        (false, true) => (true, turns + 2),
        (true, true) => (false, turns + 2),
    };

    match (mirrored, turns.rem_euclid(4)) {
        (false, 0) => Orientation::Normal,
        (false, 1) => Orientation::Rotate90CW,
        (false, 2) => Orientation::Rotate180,
        (false, _) => Orientation::Rotate270CW,
        (true, 0) => Orientation::FlipHorizontal,
        (true, 1) => Orientation::Transverse,
        (true, 2) => Orientation::FlipVertical,
        (true, _) => Orientation::Transpose,
    }
}
