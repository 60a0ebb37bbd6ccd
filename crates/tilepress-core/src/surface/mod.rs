//! Render-Encode Surface capability.
//!
//! A surface is a single mutable canvas: [`RenderSurface::draw`] renders a
//! region of a source image onto it and [`RenderSurface::encode`] turns the
//! current canvas into encoded bytes. A surface holds exactly one frame of
//! state, so it must only ever be driven by one caller at a time. The
//! [`SurfaceScheduler`](crate::scheduler::SurfaceScheduler) is the only
//! component that invokes a surface.

mod raster;
mod types;

use async_trait::async_trait;

use crate::encode::OutputKind;

pub use raster::{RasterSurface, ScaleFilter};
pub use types::{DrawCommand, EncodeRequest, EncodeResult, EncodedBuffer, SurfaceError};

/// A single-instance drawing canvas with an encoder attached.
#[async_trait]
pub trait RenderSurface: Send {
    /// Render `command.source` at `command.placement` onto a fresh canvas of
    /// `command.canvas` size.
    async fn draw(&mut self, command: &DrawCommand) -> Result<(), SurfaceError>;

    /// Encode the current canvas.
    async fn encode(
        &mut self,
        quality: f32,
        kind: OutputKind,
    ) -> Result<EncodedBuffer, SurfaceError>;
}
