use crate::coords::{LogicalSize, PhysicalSize, PixelRect};
use crate::scheduler::{HostId, OutputSurface};

const SHARED_USAGE: wgpu::TextureUsages = wgpu::TextureUsages::RENDER_ATTACHMENT
    .union(wgpu::TextureUsages::COPY_SRC)
    .union(wgpu::TextureUsages::TEXTURE_BINDING);

const OUTPUT_USAGE: wgpu::TextureUsages = wgpu::TextureUsages::RENDER_ATTACHMENT
    .union(wgpu::TextureUsages::COPY_DST)
    .union(wgpu::TextureUsages::TEXTURE_BINDING);

/// Never allocate an empty texture.
fn allocation_size(size: PhysicalSize<u32>) -> PhysicalSize<u32> {
    PhysicalSize::new(size.width.max(1), size.height.max(1))
}

fn create_texture(
    device: &wgpu::Device,
    label: &str,
    format: wgpu::TextureFormat,
    size: PhysicalSize<u32>,
    usage: wgpu::TextureUsages,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size.width,
            height: size.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

/// The shared offscreen surface every scene draws into.
pub(crate) struct SharedTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    /// Allocated size, at least 1x1.
    pub size: PhysicalSize<u32>,
    /// Display box the scheduler negotiated (`max_logical / scale`).
    ///
    /// Bookkeeping only: the compositor scales by mapping the copy region
    /// onto each placement's page rect, so it never reads this box.
    pub display: LogicalSize<f64>,
    /// Host the surface is shown inside, if any.
    pub host: Option<HostId>,
}

impl SharedTarget {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let size = allocation_size(PhysicalSize::new(0, 0));
        let (texture, view) = create_texture(device, "vista shared surface", format, size, SHARED_USAGE);
        Self {
            texture,
            view,
            size,
            display: LogicalSize::new(0.0, 0.0),
            host: None,
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, format: wgpu::TextureFormat, size: PhysicalSize<u32>) {
        let size = allocation_size(size);
        if size == self.size {
            return;
        }
        let (texture, view) = create_texture(device, "vista shared surface", format, size, SHARED_USAGE);
        self.texture.destroy();
        self.texture = texture;
        self.view = view;
        self.size = size;
    }
}

/// A widget's private output surface.
///
/// Its drawing context is the output texture, created on first copy-back and
/// dropped whenever the backing-store size changes.
#[derive(Debug)]
pub struct OutputTarget {
    size: PhysicalSize<u32>,
    /// Negotiated display box; like the shared surface's, it is not used
    /// for compositing.
    display: LogicalSize<f64>,
    texture: Option<(wgpu::Texture, wgpu::TextureView)>,
}

impl Default for OutputTarget {
    fn default() -> Self {
        Self {
            size: PhysicalSize::new(0, 0),
            display: LogicalSize::new(0.0, 0.0),
            texture: None,
        }
    }
}

impl OutputTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// View for compositing, once a context exists.
    pub fn view(&self) -> Option<&wgpu::TextureView> {
        self.texture.as_ref().map(|(_, view)| view)
    }

    pub(crate) fn texture(&self) -> Option<&wgpu::Texture> {
        self.texture.as_ref().map(|(texture, _)| texture)
    }

    pub(crate) fn allocated_size(&self) -> PhysicalSize<u32> {
        allocation_size(self.size)
    }

    pub(crate) fn create_context(&mut self, device: &wgpu::Device, format: wgpu::TextureFormat) {
        let size = self.allocated_size();
        self.texture = Some(create_texture(device, "vista output surface", format, size, OUTPUT_USAGE));
    }
}

impl OutputSurface for OutputTarget {
    fn set_size(&mut self, size: PhysicalSize<u32>) {
        if size == self.size {
            return;
        }
        self.size = size;
        if let Some((texture, _)) = self.texture.take() {
            texture.destroy();
        }
    }

    fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    fn set_display_size(&mut self, size: LogicalSize<f64>) {
        self.display = size;
    }

    fn display_size(&self) -> LogicalSize<f64> {
        self.display
    }

    fn has_context(&self) -> bool {
        self.texture.is_some()
    }
}

/// Part of `region` (top-left anchored in the shared surface) that can be
/// copied to the origin of an output of `output` size.
pub(crate) fn copy_extent(
    region: PixelRect,
    shared: PhysicalSize<u32>,
    output: PhysicalSize<u32>,
) -> Option<PixelRect> {
    let region = region.clamped_to(shared);
    let width = region.width.min(output.width);
    let height = region.height.min(output.height);
    let extent = PixelRect::new(region.x, region.y, width, height);
    (!extent.is_empty()).then_some(extent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_never_goes_below_one_pixel() {
        assert_eq!(allocation_size(PhysicalSize::new(0, 0)), PhysicalSize::new(1, 1));
        assert_eq!(allocation_size(PhysicalSize::new(640, 0)), PhysicalSize::new(640, 1));
        assert_eq!(allocation_size(PhysicalSize::new(640, 480)), PhysicalSize::new(640, 480));
    }

    #[test]
    fn copy_extent_fits_both_textures() {
        let shared = PhysicalSize::new(400, 300);
        let region = PixelRect::new(0, 0, 200, 100);
        assert_eq!(
            copy_extent(region, shared, PhysicalSize::new(400, 300)),
            Some(region)
        );
        assert_eq!(
            copy_extent(region, shared, PhysicalSize::new(150, 80)),
            Some(PixelRect::new(0, 0, 150, 80))
        );
    }

    #[test]
    fn copy_extent_clips_to_shared_surface() {
        let extent = copy_extent(
            PixelRect::new(0, 250, 200, 100),
            PhysicalSize::new(400, 300),
            PhysicalSize::new(400, 300),
        );
        assert_eq!(extent, Some(PixelRect::new(0, 250, 200, 50)));
    }

    #[test]
    fn empty_copies_are_skipped() {
        let shared = PhysicalSize::new(400, 300);
        assert_eq!(copy_extent(PixelRect::new(0, 0, 0, 10), shared, shared), None);
        assert_eq!(
            copy_extent(PixelRect::new(0, 0, 10, 10), shared, PhysicalSize::new(0, 0)),
            None
        );
    }

    #[test]
    fn output_surface_tracks_size_and_display() {
        let mut output = OutputTarget::new();
        assert!(!output.has_context());
        output.set_size(PhysicalSize::new(0, 0));
        assert_eq!(output.allocated_size(), PhysicalSize::new(1, 1));
        output.set_size(PhysicalSize::new(320, 240));
        output.set_display_size(LogicalSize::new(160.0, 120.0));
        assert_eq!(output.size(), PhysicalSize::new(320, 240));
        assert_eq!(output.display_size(), LogicalSize::new(160.0, 120.0));
        assert!(output.view().is_none());
    }
}
