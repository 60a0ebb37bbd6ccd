//! Typed abort reasons shared by every pipeline.

use std::fmt;

use thiserror::Error;

use crate::scheduler::SubmitError;
use crate::source::SourceError;
use crate::surface::SurfaceError;
use crate::transform::TransformError;

/// The pipeline step a surface fault happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    QualitySearch,
    DimensionReduction,
    Conversion,
    GridExport,
    Transform,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::QualitySearch => "quality search",
            PipelineStage::DimensionReduction => "dimension reduction",
            PipelineStage::Conversion => "conversion",
            PipelineStage::GridExport => "grid export",
            PipelineStage::Transform => "transform",
        };
        f.write_str(name)
    }
}

/// Why a pipeline was aborted. No partial result accompanies an abort.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The image source could not resolve the image's metadata.
    #[error("Image unreadable: {0}")]
    ImageUnreadable(#[from] SourceError),

    /// The surface failed a draw or encode.
    #[error("Surface fault during {stage}: {source}")]
    SurfaceFault {
        stage: PipelineStage,
        #[source]
        source: SurfaceError,
    },

    /// The scheduler's worker has stopped.
    #[error("Surface scheduler is closed")]
    SchedulerClosed,

    /// The image cannot be split into a 3x3 grid without empty cells.
    #[error("Image {width}x{height} is too small for a 3x3 grid")]
    ImageTooSmall { width: u32, height: u32 },

    /// A grid cell failed under the abort-batch policy.
    #[error("Grid cell {index} failed: {source}")]
    CellFailed {
        index: usize,
        #[source]
        source: SurfaceError,
    },

    /// The compression budget violates its invariants.
    #[error("Invalid compression budget: {0}")]
    InvalidBudget(String),

    /// The transform parameters were rejected before any draw.
    #[error("Invalid transform: {0}")]
    InvalidTransform(#[from] TransformError),
}

impl PipelineError {
    pub(crate) fn from_submit(stage: PipelineStage, err: SubmitError) -> Self {
        match err {
            SubmitError::Fault(source) => PipelineError::SurfaceFault { stage, source },
            SubmitError::Closed => PipelineError::SchedulerClosed,
        }
    }
}
