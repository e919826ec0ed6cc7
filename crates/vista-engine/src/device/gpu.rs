use std::sync::mpsc;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::coords::{LogicalSize, PixelRect};
use crate::render::SceneFrame;
use crate::scheduler::{
    ContextLost, CopyMode, DrawParams, HostId, LossReason, OutputSurface, RenderBackend,
    ViewerScene,
};

use super::blit::{blit_mapping, Blitter};
use super::surface::PageSurface;
use super::target::{copy_extent, OutputTarget, SharedTarget};
use super::{GpuInit, SurfaceErrorAction};

/// What a widget shows on the page this frame.
#[derive(Debug, Copy, Clone)]
pub enum CompositeSource<'a> {
    /// A top-left anchored region of the shared surface.
    Shared(PixelRect),
    /// The origin-anchored region of a private output that holds the
    /// widget's last copy-back.
    Output {
        target: &'a OutputTarget,
        region: PixelRect,
    },
}

/// One widget's contribution to the page.
#[derive(Debug, Copy, Clone)]
pub struct Composite<'a> {
    pub source: CompositeSource<'a>,
    /// Widget box on the page, physical pixels, top-left anchored.
    pub dest: PixelRect,
}

/// The single shared GPU context.
///
/// Owns the wgpu device and queue, the shared offscreen surface all scenes
/// draw into and, for windowed use, the page surface widgets are composited
/// onto.
pub struct Gpu {
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    init: GpuInit,

    shared: SharedTarget,
    page: Option<PageSurface>,
    blitter: Blitter,

    /// Commands recorded since `begin_frame`; submitted by `end_frame`.
    encoder: Option<wgpu::CommandEncoder>,
    lost: mpsc::Receiver<ContextLost>,
}

impl Gpu {
    /// Creates a context without a page surface (tests, tooling, offscreen use).
    pub async fn headless(init: GpuInit) -> Result<Self> {
        let instance = new_instance();
        let adapter = request_adapter(&instance, &init, None).await?;
        let (device, queue) = request_device(&adapter, &init).await?;
        Ok(Self::assemble(adapter, device, queue, None, init))
    }

    /// Creates a context that presents into `window`.
    pub async fn for_window(window: Arc<Window>, init: GpuInit) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let instance = new_instance();
        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;
        let adapter = request_adapter(&instance, &init, Some(&surface)).await?;
        let (device, queue) = request_device(&adapter, &init).await?;
        let page = PageSurface::configure(surface, &adapter, &device, size, &init)?;

        Ok(Self::assemble(adapter, device, queue, Some(page), init))
    }

    fn assemble(
        adapter: wgpu::Adapter,
        device: wgpu::Device,
        queue: wgpu::Queue,
        page: Option<PageSurface>,
        init: GpuInit,
    ) -> Self {
        let (tx, lost) = mpsc::channel();
        device.set_device_lost_callback(move |reason, message| {
            let reason = match reason {
                wgpu::DeviceLostReason::Destroyed => LossReason::Destroyed,
                _ => LossReason::Unknown,
            };
            // The receiver is gone once the context was disposed.
            let _ = tx.send(ContextLost { reason, message });
        });

        let info = adapter.get_info();
        log::info!("GPU context on {} ({:?})", info.name, info.backend);

        Self {
            shared: SharedTarget::new(&device, init.target_format),
            blitter: Blitter::default(),
            encoder: None,
            adapter,
            device,
            queue,
            init,
            page,
            lost,
        }
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Format of the page surface, when presenting to a window.
    pub fn surface_format(&self) -> Option<wgpu::TextureFormat> {
        self.page.as_ref().map(PageSurface::format)
    }

    /// Host currently showing the shared surface.
    pub fn shared_host(&self) -> Option<HostId> {
        self.shared.host
    }

    /// Reconfigures the page surface after a window resize.
    pub fn resize_page(&mut self, size: PhysicalSize<u32>) {
        if let Some(page) = self.page.as_mut() {
            page.resize(&self.device, size);
        }
    }

    /// Composites `composites` onto the page surface and presents it.
    ///
    /// Without a page surface this is a no-op.
    pub fn present(&mut self, composites: &[Composite<'_>]) -> Result<(), SurfaceErrorAction> {
        let Some(page) = self.page.as_ref() else {
            return Ok(());
        };
        let page_size = page.size();
        if page_size.width == 0 || page_size.height == 0 {
            return Ok(());
        }

        let frame = match page.acquire() {
            Ok(frame) => frame,
            Err(err) => return Err(page.recover(&self.device, err)),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.blitter.ensure_pipeline(&self.device, page.format());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("vista present encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("vista composite pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.init.page_clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            for composite in composites {
                let (source, source_size, region) = match composite.source {
                    CompositeSource::Shared(region) => (&self.shared.view, self.shared.size, region),
                    CompositeSource::Output { target, region } => match target.view() {
                        Some(view) => (view, target.allocated_size(), region),
                        None => continue,
                    },
                };
                let Some(mapping) = blit_mapping(region, source_size, composite.dest, page_size)
                else {
                    continue;
                };
                self.blitter.draw(&self.device, &mut pass, source, mapping);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}

impl RenderBackend for Gpu {
    type Output = OutputTarget;

    fn resize_shared(&mut self, size: PhysicalSize<u32>) {
        self.shared
            .resize(&self.device, self.init.target_format, size);
        log::debug!(
            "shared surface allocated at {}x{}",
            self.shared.size.width,
            self.shared.size.height
        );
    }

    fn shared_size(&self) -> PhysicalSize<u32> {
        self.shared.size
    }

    fn set_shared_display_size(&mut self, size: LogicalSize<f64>) {
        if self.shared.display != size {
            log::trace!("shared display box {:.1}x{:.1}", size.width, size.height);
        }
        self.shared.display = size;
    }

    fn attach_shared(&mut self, host: Option<HostId>) {
        self.shared.host = host;
    }

    fn begin_frame(&mut self) {
        frame_encoder(&mut self.encoder, &self.device);
    }

    fn draw(&mut self, scene: &mut dyn ViewerScene, params: DrawParams) -> Result<()> {
        let size = self.shared.size;
        let viewport = params.viewport.clamped_to(size).flipped(size.height);
        if viewport.is_empty() {
            return Ok(());
        }

        let encoder = frame_encoder(&mut self.encoder, &self.device);

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("vista scene pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.shared.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.init.scene_clear),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        pass.set_viewport(
            viewport.x as f32,
            viewport.y as f32,
            viewport.width as f32,
            viewport.height as f32,
            0.0,
            1.0,
        );
        pass.set_scissor_rect(viewport.x, viewport.y, viewport.width, viewport.height);

        let mut frame = SceneFrame {
            device: &self.device,
            queue: &self.queue,
            format: self.init.target_format,
            pass: &mut pass,
            camera: params.camera,
            exposure: params.exposure,
            viewport,
        };
        scene.record(&mut frame);
        Ok(())
    }

    fn create_output_context(&mut self, output: &mut OutputTarget) -> Result<()> {
        output.create_context(&self.device, self.init.target_format);
        Ok(())
    }

    fn copy_to_output(
        &mut self,
        region: PixelRect,
        output: &mut OutputTarget,
        mode: CopyMode,
    ) -> Result<()> {
        let Some(texture) = output.texture() else {
            bail!("output surface has no drawing context");
        };
        let Some(extent) = copy_extent(region, self.shared.size, output.size()) else {
            return Ok(());
        };

        let encoder = frame_encoder(&mut self.encoder, &self.device);

        if mode == CopyMode::Blit {
            if let Some(view) = output.view() {
                let _clear = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("vista output clear"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                    multiview_mask: None,
                });
            }
        }

        encoder.copy_texture_to_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.shared.texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: extent.x,
                    y: extent.y,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d {
                width: extent.width,
                height: extent.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn end_frame(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            self.queue.submit(std::iter::once(encoder.finish()));
        }
    }

    fn poll_context_lost(&mut self) -> Option<ContextLost> {
        self.lost.try_recv().ok()
    }

    fn dispose(&mut self) {
        self.encoder = None;
        self.shared.host = None;
        self.shared.texture.destroy();
        self.device.destroy();
    }
}

/// The per-frame encoder, created on first use.
fn frame_encoder<'e>(
    slot: &'e mut Option<wgpu::CommandEncoder>,
    device: &wgpu::Device,
) -> &'e mut wgpu::CommandEncoder {
    slot.get_or_insert_with(|| {
        device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("vista frame encoder"),
        })
    })
}

fn new_instance() -> wgpu::Instance {
    // Use all backends to allow wgpu to select the optimal platform backend.
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    })
}

async fn request_adapter(
    instance: &wgpu::Instance,
    init: &GpuInit,
    surface: Option<&wgpu::Surface<'static>>,
) -> Result<wgpu::Adapter> {
    instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: init.power_preference,
            compatible_surface: surface,
            force_fallback_adapter: init.force_fallback_adapter,
        })
        .await
        .context("failed to find a suitable GPU adapter")
}

async fn request_device(
    adapter: &wgpu::Adapter,
    init: &GpuInit,
) -> Result<(wgpu::Device, wgpu::Queue)> {
    adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("vista shared device"),
            required_features: init.required_features,
            required_limits: init.required_limits.clone(),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        })
        .await
        .context("failed to create wgpu device/queue")
}
