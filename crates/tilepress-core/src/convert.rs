//! Format conversion at native resolution.
//!
//! A single scheduled encode of the whole image, with no size search.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::encode::OutputKind;
use crate::error::{PipelineError, PipelineStage};
use crate::scheduler::SurfaceScheduler;
use crate::source::{ImageSource, RasterHandle};
use crate::surface::{EncodeRequest, EncodeResult};

/// Target format and quality of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvertOptions {
    pub kind: OutputKind,
    /// Ignored for lossless output (PNG, WebP), which always encodes at 1.0.
    pub quality: f32,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            kind: OutputKind::Photographic,
            quality: 0.9,
        }
    }
}

impl ConvertOptions {
    pub fn lossless() -> Self {
        Self {
            kind: OutputKind::Lossless,
            quality: 1.0,
        }
    }

    /// Quality actually sent to the surface.
    pub fn effective_quality(&self) -> f32 {
        if self.kind.is_lossless() {
            1.0
        } else {
            self.quality.clamp(0.0, 1.0)
        }
    }
}

/// Re-encode the image behind `handle` in another format.
pub async fn convert_format<I>(
    source: &I,
    scheduler: &SurfaceScheduler,
    handle: &RasterHandle,
    options: &ConvertOptions,
) -> Result<EncodeResult, PipelineError>
where
    I: ImageSource + ?Sized,
{
    let image = source.resolve_dimensions(handle)?;
    let request =
        EncodeRequest::scaled(handle, image, image, options.effective_quality(), options.kind);

    let result = scheduler
        .submit(request)
        .await
        .map_err(|e| PipelineError::from_submit(PipelineStage::Conversion, e))?;

    info!(
        %handle,
        kind = ?result.kind,
        bytes = ?result.byte_len,
        "convert.done"
    );
    Ok(result)
}
