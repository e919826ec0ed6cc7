use anyhow::Result;

use crate::coords::{LogicalSize, PhysicalSize, PixelRect};
use crate::render::Camera;

use super::widget::{ContextLost, HostId, ViewerScene};

/// How copy-back moves pixels into a widget's private surface.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CopyMode {
    /// Direct transfer into a transfer-capable (off-main-thread) surface.
    Transfer,
    /// Clear the private surface, then blit the region into it.
    Blit,
}

/// Per-draw parameters.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawParams {
    /// Host of the widget being drawn (labels, diagnostics).
    pub host: HostId,
    /// Bottom-left anchored viewport inside the shared surface.
    pub viewport: PixelRect,
    pub camera: Camera,
    /// Tone-mapping exposure, always finite.
    pub exposure: f32,
}

/// A widget's private output surface.
///
/// The "drawing context" of the surface is backend-specific and created on
/// demand through [`RenderBackend::create_output_context`].
pub trait OutputSurface {
    /// Sets the backing-store size in physical pixels. A size change
    /// invalidates the drawing context.
    fn set_size(&mut self, size: PhysicalSize<u32>);

    fn size(&self) -> PhysicalSize<u32>;

    /// Sets the display box size in logical pixels.
    fn set_display_size(&mut self, size: LogicalSize<f64>);

    fn display_size(&self) -> LogicalSize<f64>;

    fn has_context(&self) -> bool;
}

/// The single shared GPU rendering context.
///
/// Exclusively owned by the scheduler; widgets never address it directly.
pub trait RenderBackend {
    type Output: OutputSurface + 'static;

    /// Reallocates the shared drawing buffer.
    fn resize_shared(&mut self, size: PhysicalSize<u32>);

    fn shared_size(&self) -> PhysicalSize<u32>;

    /// Sets the display box size of the shared surface in logical pixels.
    fn set_shared_display_size(&mut self, size: LogicalSize<f64>);

    /// Moves the shared surface into `host`, or hides it when `None`.
    fn attach_shared(&mut self, host: Option<HostId>);

    /// Called once per frame before the first draw.
    fn begin_frame(&mut self) {}

    /// Draws `scene` into the shared surface.
    fn draw(&mut self, scene: &mut dyn ViewerScene, params: DrawParams) -> Result<()>;

    /// Creates the drawing context of a private surface.
    fn create_output_context(&mut self, output: &mut Self::Output) -> Result<()>;

    /// Copies `region` (top-left anchored) of the shared surface to the
    /// origin of `output`.
    fn copy_to_output(
        &mut self,
        region: PixelRect,
        output: &mut Self::Output,
        mode: CopyMode,
    ) -> Result<()>;

    /// Called once per frame after the last draw; flushes recorded work.
    fn end_frame(&mut self) {}

    /// Returns a pending context-loss signal, if the platform raised one.
    fn poll_context_lost(&mut self) -> Option<ContextLost> {
        None
    }

    /// Releases GPU resources. The backend is not used afterwards.
    fn dispose(&mut self) {}
}

/// Global collaborators provided by the host page.
pub trait HostEnvironment {
    /// Current device pixel ratio. Pathological values are sanitized by the
    /// scheduler.
    fn device_pixel_ratio(&self) -> f64;

    /// Whether widgets must use their own (off-main-thread capable) surfaces
    /// regardless of how many are visible.
    fn requires_private_surfaces(&self) -> bool {
        false
    }

    /// Whether an immersive (AR) session currently owns the GPU surface.
    fn is_presenting(&self) -> bool {
        false
    }
}

/// Explicit state of the shared context.
#[derive(Debug)]
pub enum RendererState<B> {
    /// No working context: construction failed or the scheduler was disposed.
    Uninitialized,
    Ready(B),
    /// The platform reported context loss. Kept only so it can be released.
    Lost(B),
}

impl<B> RendererState<B> {
    pub fn is_ready(&self) -> bool {
        matches!(self, RendererState::Ready(_))
    }

    pub fn ready(&self) -> Option<&B> {
        match self {
            RendererState::Ready(backend) => Some(backend),
            _ => None,
        }
    }

    pub fn ready_mut(&mut self) -> Option<&mut B> {
        match self {
            RendererState::Ready(backend) => Some(backend),
            _ => None,
        }
    }
}

/// Clamps a raw device pixel ratio to something usable.
pub(crate) fn sanitize_dpr(raw: f64) -> f64 {
    if raw.is_finite() && raw > 0.0 { raw } else { 1.0 }
}

/// Clamps a raw exposure to something usable.
pub(crate) fn sanitize_exposure(raw: f32) -> f32 {
    if raw.is_finite() { raw } else { 1.0 }
}
