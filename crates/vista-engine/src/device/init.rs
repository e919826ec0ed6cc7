/// Initialization parameters for the GPU layer.
///
/// Keep this structure stable and minimal. Add configuration flags only when a
/// concrete platform or backend requirement exists.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Adapter selection hint.
    pub power_preference: wgpu::PowerPreference,

    /// Request the software fallback adapter (CI machines without a GPU).
    pub force_fallback_adapter: bool,

    /// Prefer an sRGB page-surface format when available.
    pub prefer_srgb: bool,

    /// Present mode (swap behavior) of the page surface.
    ///
    /// FIFO is broadly supported and generally appropriate for viewer pages.
    pub present_mode: wgpu::PresentMode,

    /// Optional alpha mode preference for the page surface.
    ///
    /// If provided but unsupported on the current surface, a supported mode is selected.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Required wgpu features.
    ///
    /// Favor an empty set for portability unless a feature is strictly necessary.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,

    /// Desired maximum frame latency for the page surface.
    ///
    /// This value is a hint; support depends on platform/backend.
    pub desired_maximum_frame_latency: u32,

    /// Format of the shared surface and of every private output surface.
    ///
    /// Both ends of a copy-back must agree, so this is fixed per context.
    pub target_format: wgpu::TextureFormat,

    /// Clear color of the shared surface before each scene draw.
    pub scene_clear: wgpu::Color,

    /// Page background behind the composited widgets.
    pub page_clear: wgpu::Color,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
            target_format: wgpu::TextureFormat::Rgba8UnormSrgb,
            scene_clear: wgpu::Color {
                r: 0.06,
                g: 0.06,
                b: 0.07,
                a: 1.0,
            },
            page_clear: wgpu::Color {
                r: 0.015,
                g: 0.015,
                b: 0.02,
                a: 1.0,
            },
        }
    }
}
