//! Grid Partitioner.
//!
//! Splits an image into an exact 3x3 grid and exports every cell as an
//! independently encoded tile at the source's native resolution. Cells are
//! exported one at a time in row-major order through the scheduler.
//!
//! A failed cell either leaves a gap in the result
//! ([`CellFailurePolicy::ContinueWithGap`]) or aborts the batch
//! ([`CellFailurePolicy::AbortBatch`]). A closed scheduler always aborts.

mod plan;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::encode::OutputKind;
use crate::error::PipelineError;
use crate::scheduler::{SubmitError, SurfaceScheduler};
use crate::source::{ImageSource, RasterHandle};
use crate::surface::{EncodeRequest, EncodeResult, SurfaceError};

pub use plan::{plan_grid, CellSpec, GridPlan, GRID_CELLS, GRID_EDGE};

/// What to do when a cell's export fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CellFailurePolicy {
    /// Record the failure, leave the slot empty and export the remaining
    /// cells.
    #[default]
    ContinueWithGap,
    /// Stop at the first failure and return `CellFailed`.
    AbortBatch,
}

/// Grid export settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridOptions {
    pub on_cell_failure: CellFailurePolicy,
    pub kind: OutputKind,
    pub quality: f32,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            on_cell_failure: CellFailurePolicy::ContinueWithGap,
            kind: OutputKind::Lossless,
            quality: 1.0,
        }
    }
}

/// A cell that could not be exported.
#[derive(Debug, Clone, PartialEq)]
pub struct CellFailure {
    pub cell: CellSpec,
    pub error: SurfaceError,
}

/// Exported tiles indexed `row * 3 + col`.
#[derive(Debug, Clone)]
pub struct GridTiles {
    pub plan: GridPlan,
    pub slots: [Option<EncodeResult>; GRID_CELLS],
    /// Failed cells, in export order.
    pub failures: Vec<CellFailure>,
}

impl GridTiles {
    pub fn tile(&self, row: u32, col: u32) -> Option<&EncodeResult> {
        let cell = self.plan.cell(row, col)?;
        self.slots[cell.index()].as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of exported tiles.
    pub fn exported(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn into_slots(self) -> [Option<EncodeResult>; GRID_CELLS] {
        self.slots
    }
}

/// Partition the image behind `handle` and export all nine tiles.
pub async fn partition_grid<I>(
    source: &I,
    scheduler: &SurfaceScheduler,
    handle: &RasterHandle,
    options: &GridOptions,
) -> Result<GridTiles, PipelineError>
where
    I: ImageSource + ?Sized,
{
    let image = source.resolve_dimensions(handle)?;
    let plan = plan_grid(image)?;
    debug!(
        %handle,
        width = image.width,
        height = image.height,
        cell_width = plan.base_cell().width,
        cell_height = plan.base_cell().height,
        "grid.plan"
    );

    let mut slots: [Option<EncodeResult>; GRID_CELLS] = std::array::from_fn(|_| None);
    let mut failures = Vec::new();

    for cell in plan.cells {
        let request =
            EncodeRequest::cropped(handle, image, cell.region, options.quality, options.kind);

        match scheduler.submit(request).await {
            Ok(result) => {
                debug!(index = cell.index(), bytes = ?result.byte_len, "grid.cell_exported");
                slots[cell.index()] = Some(result);
            }
            Err(SubmitError::Closed) => return Err(PipelineError::SchedulerClosed),
            Err(SubmitError::Fault(error)) => {
                warn!(index = cell.index(), error = %error, "grid.cell_failed");
                if options.on_cell_failure == CellFailurePolicy::AbortBatch {
                    return Err(PipelineError::CellFailed {
                        index: cell.index(),
                        source: error,
                    });
                }
                failures.push(CellFailure { cell, error });
            }
        }
    }

    let tiles = GridTiles {
        plan,
        slots,
        failures,
    };
    info!(
        exported = tiles.exported(),
        failed = tiles.failures.len(),
        "grid.done"
    );
    Ok(tiles)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{Rgb, RgbImage};

    use super::*;
    use crate::geometry::{PixelRect, Size};
    use crate::scheduler::testing::{ScriptedSurface, Step};
    use crate::scheduler::SchedulerConfig;
    use crate::source::{DecodingSource, SourceError};
    use crate::surface::RasterSurface;

    struct FixedSource(Size);

    impl ImageSource for FixedSource {
        fn resolve_dimensions(&self, _: &RasterHandle) -> Result<Size, SourceError> {
            Ok(self.0)
        }

        fn resolve_byte_size(&self, _: &RasterHandle) -> Result<u64, SourceError> {
            Err(SourceError::Io("not tracked".into()))
        }
    }

    fn handle() -> RasterHandle {
        RasterHandle::from_path("board.png")
    }

    fn failing_at(index: usize, step: Step) -> ScriptedSurface {
        let mut script = vec![Step::Bytes(100); GRID_CELLS];
        script[index] = step;
        ScriptedSurface::new(script, 100)
    }

    #[tokio::test(start_paused = true)]
    async fn test_exports_nine_tiles_in_row_major_order() {
        let surface = ScriptedSurface::constant(100);
        let scheduler = SurfaceScheduler::spawn(surface.clone(), SchedulerConfig::default());

        let tiles = partition_grid(
            &FixedSource(Size::new(301, 301)),
            &scheduler,
            &handle(),
            &GridOptions::default(),
        )
        .await
        .unwrap();

        assert!(tiles.is_complete());
        assert_eq!(tiles.exported(), 9);
        assert_eq!(tiles.tile(0, 0).unwrap().size, Size::new(100, 100));
        assert_eq!(tiles.tile(2, 2).unwrap().size, Size::new(101, 101));
        assert_eq!(tiles.tile(0, 2).unwrap().size, Size::new(101, 100));

        let calls = surface.calls();
        assert_eq!(calls.len(), 9);
        let origins: Vec<(i64, i64)> = calls
            .iter()
            .map(|c| (-c.command.placement.x, -c.command.placement.y))
            .collect();
        assert_eq!(
            origins,
            vec![
                (0, 0),
                (100, 0),
                (200, 0),
                (0, 100),
                (100, 100),
                (200, 100),
                (0, 200),
                (100, 200),
                (200, 200),
            ]
        );
        for call in &calls {
            assert_eq!(call.kind, Some(OutputKind::Lossless));
            assert!(call.command.is_identity_scale());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_cell_leaves_single_gap() {
        let surface = failing_at(4, Step::FailEncode);
        let scheduler = SurfaceScheduler::spawn(surface.clone(), SchedulerConfig::default());

        let tiles = partition_grid(
            &FixedSource(Size::new(90, 90)),
            &scheduler,
            &handle(),
            &GridOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(tiles.exported(), 8);
        assert!(tiles.tile(1, 1).is_none());
        assert_eq!(tiles.failures.len(), 1);
        assert_eq!(tiles.failures[0].cell.index(), 4);
        assert_eq!(surface.calls().len(), 9);

        let slots = tiles.into_slots();
        for (i, slot) in slots.iter().enumerate() {
            assert_eq!(slot.is_some(), i != 4);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_batch_stops_at_first_failure() {
        let surface = failing_at(2, Step::FailDraw);
        let scheduler = SurfaceScheduler::spawn(surface.clone(), SchedulerConfig::default());
        let options = GridOptions {
            on_cell_failure: CellFailurePolicy::AbortBatch,
            ..GridOptions::default()
        };

        let err = partition_grid(&FixedSource(Size::new(90, 90)), &scheduler, &handle(), &options)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::CellFailed {
                index: 2,
                source: SurfaceError::Draw(_)
            }
        ));
        assert_eq!(surface.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_scheduler_aborts_despite_continue_policy() {
        let surface = failing_at(3, Step::Crash);
        let scheduler = SurfaceScheduler::spawn(surface.clone(), SchedulerConfig::default());

        let err = partition_grid(
            &FixedSource(Size::new(90, 90)),
            &scheduler,
            &handle(),
            &GridOptions::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PipelineError::SchedulerClosed));
        assert!(scheduler.is_closed());
        // Cells 0..=2 exported, cell 3 took the worker down, nothing after
        assert_eq!(surface.calls().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_too_small_image_rejected_before_export() {
        let surface = ScriptedSurface::constant(100);
        let scheduler = SurfaceScheduler::spawn(surface.clone(), SchedulerConfig::default());

        let err = partition_grid(
            &FixedSource(Size::new(2, 50)),
            &scheduler,
            &handle(),
            &GridOptions::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PipelineError::ImageTooSmall { .. }));
        assert!(surface.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_partition_is_identical() {
        let surface = ScriptedSurface::constant(100);
        let scheduler = SurfaceScheduler::spawn(surface.clone(), SchedulerConfig::default());
        let source = FixedSource(Size::new(301, 200));

        let first = partition_grid(&source, &scheduler, &handle(), &GridOptions::default())
            .await
            .unwrap();
        let second = partition_grid(&source, &scheduler, &handle(), &GridOptions::default())
            .await
            .unwrap();

        assert_eq!(first.plan, second.plan);
        let calls = surface.calls();
        for i in 0..GRID_CELLS {
            assert_eq!(calls[i].command, calls[i + GRID_CELLS].command);
        }
    }

    #[tokio::test]
    async fn test_exif_rotated_source_is_tiled_upright() {
        // Stored 60x30 with a dark left half; displayed rotated 90 CW as 30x60
        // with the dark half on top
        let stored = RgbImage::from_fn(60, 30, |x, _| {
            if x < 30 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        });
        let jpeg = crate::source::orientation::fixtures::jpeg_with_orientation(&stored, 6);
        let handle = RasterHandle::from_bytes(jpeg);

        let scheduler = SurfaceScheduler::spawn(RasterSurface::new(), SchedulerConfig::immediate());
        let tiles = partition_grid(&DecodingSource::new(), &scheduler, &handle, &GridOptions::default())
            .await
            .unwrap();

        assert!(tiles.is_complete());
        assert_eq!(tiles.plan.source, Size::new(30, 60));

        let mean = |row: u32, col: u32| {
            let result = tiles.tile(row, col).unwrap();
            let tile = image::load_from_memory(&result.buffer.read().unwrap())
                .unwrap()
                .into_rgb8();
            assert_eq!(tile.dimensions(), (10, 20));
            let sum: u64 = tile.pixels().map(|p| p[0] as u64).sum();
            sum / (10 * 20)
        };
        assert!(mean(0, 1) < 40);
        assert!(mean(2, 1) > 215);
    }

    #[tokio::test]
    async fn test_tiles_reassemble_source_pixels() {
        let img = RgbImage::from_fn(31, 32, |x, y| Rgb([x as u8, y as u8, (x + y) as u8]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        let handle = RasterHandle::from_bytes(out.into_inner());

        let scheduler = SurfaceScheduler::spawn(RasterSurface::new(), SchedulerConfig::immediate());
        let tiles = partition_grid(&DecodingSource::new(), &scheduler, &handle, &GridOptions::default())
            .await
            .unwrap();
        assert!(tiles.is_complete());

        for cell in &tiles.plan.cells {
            let result = tiles.slots[cell.index()].as_ref().unwrap();
            let tile = image::load_from_memory(&result.buffer.read().unwrap())
                .unwrap()
                .into_rgb8();
            let PixelRect { x, y, width, height } = cell.region;

            assert_eq!(tile.dimensions(), (width, height));
            for ty in 0..height {
                for tx in 0..width {
                    assert_eq!(tile.get_pixel(tx, ty), img.get_pixel(x + tx, y + ty));
                }
            }
        }
    }
}
