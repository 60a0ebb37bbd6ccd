//! Pixel-space value types shared by every pipeline.
//!
//! # Coordinate System
//!
//! - Origin is the top-left corner of the source image
//! - Source regions are always inside the source (unsigned origin)
//! - Placements on a canvas may start at a negative offset; whatever falls
//!   outside the canvas is clipped

use serde::{Deserialize, Serialize};

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total number of pixels.
    pub fn area(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// True when either edge is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A rectangle in source pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The rectangle covering a whole image of the given size.
    pub fn full(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Exclusive right edge, saturating at `u32::MAX`.
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge, saturating at `u32::MAX`.
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    pub fn area(&self) -> u64 {
        self.size().area()
    }

    /// Whether the rectangle lies entirely inside an image of `bounds` size.
    pub fn fits_within(&self, bounds: Size) -> bool {
        self.right() <= bounds.width && self.bottom() <= bounds.height
    }

    /// Whether two rectangles share at least one pixel.
    pub fn intersects(&self, other: &PixelRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Where a drawn region lands on the output canvas.
///
/// `x`/`y` may be negative: drawing a full image at `(-cx, -cy)` onto a
/// canvas of the cell's size crops that cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Placement {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl Placement {
    /// A placement filling a canvas of `size` from the origin.
    pub fn at_origin(size: Size) -> Self {
        Self {
            x: 0,
            y: 0,
            width: size.width,
            height: size.height,
        }
    }

    /// A placement translated so that `origin` of the drawn image lands on
    /// the canvas origin.
    pub fn shifted(size: Size, origin_x: u32, origin_y: u32) -> Self {
        Self {
            x: -(origin_x as i64),
            y: -(origin_y as i64),
            width: size.width,
            height: size.height,
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Visible part of this placement on a canvas, as
    /// `(canvas_rect, offset_into_placement)`. `None` when nothing is visible.
    pub fn clip_to(&self, canvas: Size) -> Option<(PixelRect, (u32, u32))> {
        let left = self.x.max(0);
        let top = self.y.max(0);
        let right = (self.x + self.width as i64).min(canvas.width as i64);
        let bottom = (self.y + self.height as i64).min(canvas.height as i64);

        if right <= left || bottom <= top {
            return None;
        }

        let visible = PixelRect::new(
            left as u32,
            top as u32,
            (right - left) as u32,
            (bottom - top) as u32,
        );
        let offset = ((left - self.x) as u32, (top - self.y) as u32);
        Some((visible, offset))
    }
}
