//! Exact 3x3 partition geometry.
//!
//! `plan_grid` is a pure function of the image size. Remainder pixels go to
//! the last column and last row, so column widths sum to the image width,
//! row heights sum to the image height, and no two cells share a pixel.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::geometry::{PixelRect, Size};

/// Cells per edge.
pub const GRID_EDGE: u32 = 3;

/// Total number of cells.
pub const GRID_CELLS: usize = 9;

/// One cell of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSpec {
    pub row: u32,
    pub col: u32,
    /// Region of the source covered by this cell.
    pub region: PixelRect,
}

impl CellSpec {
    /// Row-major index, `row * 3 + col`.
    pub fn index(&self) -> usize {
        (self.row * GRID_EDGE + self.col) as usize
    }
}

/// Nine cells in row-major order covering the source exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPlan {
    pub source: Size,
    pub cells: [CellSpec; GRID_CELLS],
}

impl GridPlan {
    pub fn cell(&self, row: u32, col: u32) -> Option<&CellSpec> {
        if row >= GRID_EDGE || col >= GRID_EDGE {
            return None;
        }
        self.cells.get((row * GRID_EDGE + col) as usize)
    }

    /// Base cell size before remainders are added.
    pub fn base_cell(&self) -> Size {
        Size::new(self.source.width / GRID_EDGE, self.source.height / GRID_EDGE)
    }
}

/// Partition an image of `size` into a 3x3 grid.
///
/// Fails with `ImageTooSmall` if either edge is below 3 pixels, since the
/// first cells would then be empty.
pub fn plan_grid(size: Size) -> Result<GridPlan, PipelineError> {
    if size.width < GRID_EDGE || size.height < GRID_EDGE {
        return Err(PipelineError::ImageTooSmall {
            width: size.width,
            height: size.height,
        });
    }

    let cell_w = size.width / GRID_EDGE;
    let cell_h = size.height / GRID_EDGE;
    let rem_w = size.width - cell_w * GRID_EDGE;
    let rem_h = size.height - cell_h * GRID_EDGE;

    let cells = std::array::from_fn(|index| {
        let row = index as u32 / GRID_EDGE;
        let col = index as u32 % GRID_EDGE;

        let mut width = cell_w;
        let mut height = cell_h;
        if col == GRID_EDGE - 1 {
            width += rem_w;
        }
        if row == GRID_EDGE - 1 {
            height += rem_h;
        }

        CellSpec {
            row,
            col,
            region: PixelRect::new(col * cell_w, row * cell_h, width, height),
        }
    });

    Ok(GridPlan {
        source: size,
        cells,
    })
}
