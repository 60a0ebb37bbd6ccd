//! Engine facade binding an image source to one scheduler.

use std::sync::Arc;

use crate::compress::{self, CompressionBudget, CompressionOutcome};
use crate::convert::{self, ConvertOptions};
use crate::error::PipelineError;
use crate::grid::{self, GridOptions, GridTiles};
use crate::scheduler::{SchedulerConfig, SurfaceScheduler};
use crate::source::{DecodingSource, ImageSource, RasterHandle};
use crate::surface::{EncodeResult, RasterSurface, RenderSurface};
use crate::transform::{self, TransformOptions};

/// Runs the pipelines against a shared source and a single scheduled
/// surface. Clones share both.
pub struct Engine<I: ?Sized = DecodingSource> {
    source: Arc<I>,
    scheduler: SurfaceScheduler,
}

impl<I: ?Sized> Clone for Engine<I> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            scheduler: self.scheduler.clone(),
        }
    }
}

impl Engine<DecodingSource> {
    /// Header-probing source and the in-process rasterizer with no settle
    /// delay.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn in_process() -> Self {
        let scheduler = SurfaceScheduler::spawn(RasterSurface::new(), SchedulerConfig::immediate());
        Self::with_scheduler(Arc::new(DecodingSource::new()), scheduler)
    }
}

impl<I: ImageSource + ?Sized> Engine<I> {
    /// Spawn a scheduler for `surface` and bind it to `source`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new<S>(source: Arc<I>, surface: S, config: SchedulerConfig) -> Self
    where
        S: RenderSurface + 'static,
    {
        Self::with_scheduler(source, SurfaceScheduler::spawn(surface, config))
    }

    pub fn with_scheduler(source: Arc<I>, scheduler: SurfaceScheduler) -> Self {
        Self { source, scheduler }
    }

    pub fn source(&self) -> &I {
        &self.source
    }

    pub fn scheduler(&self) -> &SurfaceScheduler {
        &self.scheduler
    }

    pub async fn compress_to_budget(
        &self,
        handle: &RasterHandle,
        budget: &CompressionBudget,
    ) -> Result<CompressionOutcome, PipelineError> {
        compress::compress_to_budget(&*self.source, &self.scheduler, handle, budget).await
    }

    pub async fn partition_grid(
        &self,
        handle: &RasterHandle,
        options: &GridOptions,
    ) -> Result<GridTiles, PipelineError> {
        grid::partition_grid(&*self.source, &self.scheduler, handle, options).await
    }

    pub async fn convert_format(
        &self,
        handle: &RasterHandle,
        options: &ConvertOptions,
    ) -> Result<EncodeResult, PipelineError> {
        convert::convert_format(&*self.source, &self.scheduler, handle, options).await
    }

    pub async fn apply_transform(
        &self,
        handle: &RasterHandle,
        options: &TransformOptions,
    ) -> Result<EncodeResult, PipelineError> {
        transform::apply_transform(&*self.source, &self.scheduler, handle, options).await
    }
}
