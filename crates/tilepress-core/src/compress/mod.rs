//! Size-Seeking Compressor.
//!
//! Produces an encoded image no larger than a byte budget, preferring to
//! keep the full resolution.
//!
//! # State Machine
//!
//! 1. **Probe**: resolve the intrinsic size. Failure aborts with
//!    `ImageUnreadable`.
//! 2. **Quality search**: encode at full resolution, starting at
//!    `start_quality` and dropping by `quality_step` while over budget and
//!    still at or above `quality_floor`. Auto mode accepts the first pass.
//! 3. **Dimension reduction**: if the floor is reached and the output is
//!    still too large, scale each edge by
//!    `sqrt(target / estimated_raw_bytes) * reduction_margin` (never below
//!    `min_dimension`) and encode once at `reduction_quality`. The result is
//!    accepted whatever its size.
//!
//! A result whose byte length cannot be measured is accepted as-is. Callers
//! that need a strict guarantee must check [`CompressionOutcome::within_budget`].

mod budget;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{PipelineError, PipelineStage};
use crate::geometry::Size;
use crate::report::compression_ratio;
use crate::scheduler::SurfaceScheduler;
use crate::source::{ImageInfo, ImageSource, RasterHandle};
use crate::surface::{EncodeRequest, EncodeResult};

pub use budget::{CompressionBudget, TargetSize, FALLBACK_TARGET_KB, MIN_QUALITY_STEP};

/// How the compressor arrived at its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionPath {
    /// Auto mode: a single pass, no budget.
    SinglePass,
    /// A quality-search attempt met the budget.
    WithinBudget,
    /// The result's size could not be measured and was accepted.
    Unmeasured,
    /// Quality alone could not meet the budget; the output was downscaled.
    DimensionReduced,
}

/// Final result of a compression run.
#[derive(Debug, Clone)]
pub struct CompressionOutcome {
    pub result: EncodeResult,
    pub path: CompressionPath,
    /// Quality of the final encode.
    pub quality: f32,
    /// Pixel size of the final encode.
    pub size: Size,
    /// Number of surface submissions made.
    pub attempts: u32,
    pub target: TargetSize,
    /// Metadata of the source image.
    pub original: ImageInfo,
}

impl CompressionOutcome {
    /// Whether the final output meets the target.
    ///
    /// Always true in auto mode. `None` when the output size is unknown.
    pub fn within_budget(&self) -> Option<bool> {
        match self.target {
            TargetSize::Auto => Some(true),
            TargetSize::Bytes(limit) => self.result.byte_len.map(|len| len <= limit),
        }
    }

    /// Percentage saved relative to `original_bytes`.
    pub fn ratio_against(&self, original_bytes: u64) -> Option<f64> {
        self.result
            .byte_len
            .map(|len| compression_ratio(original_bytes, len))
    }

    /// Percentage saved relative to the source's encoded size, when both
    /// sizes are known.
    pub fn compression_ratio(&self) -> Option<f64> {
        self.original
            .byte_size
            .and_then(|orig| self.ratio_against(orig))
    }
}

/// Output size for the dimension-reduction pass, and the scale factor used.
///
/// Each edge is scaled independently and clamped to `min_dimension`, so the
/// output is never degenerate.
pub fn reduced_dimensions(
    image: Size,
    target_bytes: u64,
    estimated_bytes: u64,
    margin: f64,
    min_dimension: u32,
) -> (Size, f64) {
    let scale = (target_bytes as f64 / estimated_bytes.max(1) as f64).sqrt() * margin;
    let edge = |len: u32| ((len as f64 * scale).floor() as u32).max(min_dimension);
    (Size::new(edge(image.width), edge(image.height)), scale)
}

/// Compress the image behind `handle` to fit `budget`.
pub async fn compress_to_budget<I>(
    source: &I,
    scheduler: &SurfaceScheduler,
    handle: &RasterHandle,
    budget: &CompressionBudget,
) -> Result<CompressionOutcome, PipelineError>
where
    I: ImageSource + ?Sized,
{
    budget.validate()?;

    let original = source.probe(handle)?;
    let image = original.size;
    debug!(
        %handle,
        width = image.width,
        height = image.height,
        target = %budget.target,
        "compress.probe"
    );

    let finish = |result: EncodeResult, path: CompressionPath, attempts: u32| {
        let outcome = CompressionOutcome {
            quality: result.quality,
            size: result.size,
            result,
            path,
            attempts,
            target: budget.target,
            original,
        };
        info!(
            path = ?outcome.path,
            attempts = outcome.attempts,
            quality = outcome.quality,
            bytes = ?outcome.result.byte_len,
            "compress.done"
        );
        outcome
    };

    let Some(limit) = budget.target.limit() else {
        let request =
            EncodeRequest::scaled(handle, image, image, budget.start_quality, budget.kind);
        let result = scheduler
            .submit(request)
            .await
            .map_err(|e| PipelineError::from_submit(PipelineStage::QualitySearch, e))?;
        return Ok(finish(result, CompressionPath::SinglePass, 1));
    };

    let mut attempts = 0u32;
    for quality in budget.quality_schedule() {
        let request = EncodeRequest::scaled(handle, image, image, quality, budget.kind);
        let result = scheduler
            .submit(request)
            .await
            .map_err(|e| PipelineError::from_submit(PipelineStage::QualitySearch, e))?;
        attempts += 1;

        match result.byte_len {
            None => {
                warn!(quality, "compress.unmeasured accepting result");
                return Ok(finish(result, CompressionPath::Unmeasured, attempts));
            }
            Some(len) if len <= limit => {
                return Ok(finish(result, CompressionPath::WithinBudget, attempts));
            }
            Some(len) => {
                debug!(quality, bytes = len, limit, "compress.quality_step over budget");
            }
        }
    }

    let (reduced, scale) = reduced_dimensions(
        image,
        limit,
        original.estimated_raw_bytes(),
        budget.reduction_margin,
        budget.min_dimension,
    );
    debug!(
        scale,
        width = reduced.width,
        height = reduced.height,
        "compress.dimension_reduction"
    );

    let request =
        EncodeRequest::scaled(handle, image, reduced, budget.reduction_quality, budget.kind);
    let result = scheduler
        .submit(request)
        .await
        .map_err(|e| PipelineError::from_submit(PipelineStage::DimensionReduction, e))?;
    attempts += 1;

    if result.byte_len.is_some_and(|len| len > limit) {
        warn!(bytes = ?result.byte_len, limit, "compress.budget_missed");
    }
    Ok(finish(result, CompressionPath::DimensionReduced, attempts))
}
