use crate::coords::PixelRect;

use super::Camera;

/// Everything a scene sees while recording its draw into the shared surface.
///
/// The render pass targets the shared offscreen surface with the widget's
/// viewport and scissor already applied. `viewport` is top-left anchored, in
/// physical pixels of the shared surface.
///
/// Lifetimes:
/// - `'a` is the duration of the `record` call
/// - `'p` is the encoder borrow carried by the render pass
pub struct SceneFrame<'a, 'p> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub format: wgpu::TextureFormat,
    pub pass: &'a mut wgpu::RenderPass<'p>,
    pub camera: Camera,
    /// Tone-mapping exposure, always finite.
    pub exposure: f32,
    pub viewport: PixelRect,
}

impl SceneFrame<'_, '_> {
    /// Aspect ratio of the viewport (width / height), 1.0 when degenerate.
    pub fn aspect(&self) -> f32 {
        if self.viewport.height == 0 {
            1.0
        } else {
            self.viewport.width as f32 / self.viewport.height as f32
        }
    }
}
