//! Tilepress Core - raster transform engine
//!
//! Two pipelines run over an image source and a single scheduled
//! render-encode surface:
//!
//! - the size-seeking compressor ([`compress_to_budget`]) searches encode
//!   quality and, if needed, output dimensions until the result fits a byte
//!   budget
//! - the grid partitioner ([`partition_grid`]) cuts an image into an exact
//!   3x3 grid and exports every cell as its own tile
//!
//! Format conversion ([`convert_format`]) and geometric transforms
//! ([`apply_transform`]: flip, quarter-turn rotation, ratio crop) are single
//! scheduled passes.
//!
//! Every draw/encode goes through [`SurfaceScheduler`], which owns the
//! surface and serves requests one at a time in submission order.

pub mod compress;
pub mod convert;
pub mod decode;
pub mod encode;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod report;
pub mod scheduler;
pub mod source;
pub mod surface;
pub mod transform;

pub use compress::{
    compress_to_budget, CompressionBudget, CompressionOutcome, CompressionPath, TargetSize,
};
pub use convert::{convert_format, ConvertOptions};
pub use encode::OutputKind;
pub use engine::Engine;
pub use error::{PipelineError, PipelineStage};
pub use geometry::{PixelRect, Placement, Size};
pub use grid::{partition_grid, plan_grid, CellFailurePolicy, GridOptions, GridPlan, GridTiles};
pub use report::{compression_ratio, format_file_size};
pub use scheduler::{SchedulerConfig, SettlePolicy, SurfaceScheduler};
pub use source::{DecodingSource, ImageInfo, ImageSource, RasterHandle};
pub use surface::{EncodeRequest, EncodeResult, EncodedBuffer, RasterSurface, RenderSurface};
pub use transform::{apply_transform, CropRatio, Rotation, TransformOptions};
