use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

use bytemuck::{Pod, Zeroable};
use vista_engine::coords::LogicalSize;
use vista_engine::device::OutputTarget;
use vista_engine::render::{Camera, SceneFrame};
use vista_engine::scheduler::{
    DisplaySurface, HostId, ViewerEvent, ViewerScene, ViewerWidget, WidgetRef,
};

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct TurntableUniform {
    view_proj: [[f32; 4]; 4],
    color: [f32; 4],
    /// x: exposure
    params: [f32; 4],
}

/// GPU objects of one scene, created on its first draw.
struct SceneGpu {
    format: wgpu::TextureFormat,
    pipeline: wgpu::RenderPipeline,
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// A cube spinning at a fixed rate.
pub struct TurntableScene {
    size: LogicalSize<f64>,
    dirty: bool,
    yaw: f32,
    /// Radians per second.
    spin: f32,
    color: [f32; 4],
    exposure: f32,
    gpu: Option<SceneGpu>,
}

impl TurntableScene {
    pub fn new(size: LogicalSize<f64>, spin: f32, color: [f32; 4]) -> Self {
        Self {
            size,
            dirty: true,
            yaw: 0.0,
            spin,
            color,
            exposure: 1.0,
            gpu: None,
        }
    }

    pub fn set_size(&mut self, size: LogicalSize<f64>) {
        if size != self.size {
            self.size = size;
            self.dirty = true;
        }
    }

    pub fn exposure(&self) -> f32 {
        self.exposure
    }

    pub fn set_exposure(&mut self, exposure: f32) {
        self.exposure = exposure;
        self.dirty = true;
    }

    fn advance(&mut self, delta_ms: f64) {
        self.yaw = (self.yaw + self.spin * (delta_ms / 1000.0) as f32) % std::f32::consts::TAU;
        self.dirty = true;
    }

    fn ensure_gpu(&mut self, device: &wgpu::Device, format: wgpu::TextureFormat) {
        if self.gpu.as_ref().is_some_and(|gpu| gpu.format == format) {
            return;
        }

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("turntable shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/turntable.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("turntable bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<TurntableUniform>() as u64,
                    ),
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("turntable pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("turntable pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            // The cube is convex, so back-face culling stands in for a depth buffer.
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let uniform = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("turntable ubo"),
            size: std::mem::size_of::<TurntableUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("turntable bind group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.as_entire_binding(),
            }],
        });

        self.gpu = Some(SceneGpu {
            format,
            pipeline,
            uniform,
            bind_group,
        });
    }
}

impl ViewerScene for TurntableScene {
    fn size(&self) -> LogicalSize<f64> {
        self.size
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    fn camera(&self) -> Camera {
        Camera::orbit(self.yaw, (self.size.width / self.size.height.max(1.0)) as f32)
    }

    fn exposure(&self) -> f32 {
        self.exposure
    }

    fn record(&mut self, frame: &mut SceneFrame<'_, '_>) {
        self.ensure_gpu(frame.device, frame.format);
        let Some(gpu) = self.gpu.as_ref() else {
            return;
        };

        let uniform = TurntableUniform {
            view_proj: Camera::orbit(self.yaw, frame.aspect()).view_proj,
            color: self.color,
            params: [frame.exposure, 0.0, 0.0, 0.0],
        };
        frame
            .queue
            .write_buffer(&gpu.uniform, 0, bytemuck::bytes_of(&uniform));

        frame.pass.set_pipeline(&gpu.pipeline);
        frame.pass.set_bind_group(0, &gpu.bind_group, &[]);
        frame.pass.draw(0..36, 0..1);
    }
}

/// A viewer widget hosting one turntable scene.
///
/// The box size is owned by the page layout; the widget re-reads it when
/// asked to re-measure.
pub struct TurntableWidget {
    host: HostId,
    label: &'static str,
    scene: TurntableScene,
    output: OutputTarget,
    box_size: Rc<Cell<LogicalSize<f64>>>,
    visible: bool,
    ready_at: Instant,
    showing: Option<DisplaySurface>,
    context_lost: bool,
}

impl TurntableWidget {
    pub fn new(
        host: HostId,
        label: &'static str,
        box_size: Rc<Cell<LogicalSize<f64>>>,
        spin: f32,
        color: [f32; 4],
        load_time: Duration,
    ) -> Self {
        Self {
            host,
            label,
            scene: TurntableScene::new(box_size.get(), spin, color),
            output: OutputTarget::new(),
            box_size,
            visible: true,
            ready_at: Instant::now() + load_time,
            showing: None,
            context_lost: false,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn context_lost(&self) -> bool {
        self.context_lost
    }

    pub fn turntable_mut(&mut self) -> &mut TurntableScene {
        &mut self.scene
    }

    /// Shares the widget with the scheduler and keeps a typed handle.
    pub fn into_shared(self) -> (Rc<RefCell<TurntableWidget>>, WidgetRef<OutputTarget>) {
        let typed = Rc::new(RefCell::new(self));
        let erased: WidgetRef<OutputTarget> = typed.clone();
        (typed, erased)
    }
}

impl ViewerWidget for TurntableWidget {
    type Output = OutputTarget;

    fn host(&self) -> HostId {
        self.host
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn is_ready(&self) -> bool {
        Instant::now() >= self.ready_at
    }

    fn scene(&self) -> &dyn ViewerScene {
        &self.scene
    }

    fn scene_mut(&mut self) -> &mut dyn ViewerScene {
        &mut self.scene
    }

    fn tick(&mut self, _t: f64, delta: f64) {
        self.scene.advance(delta);
    }

    fn recompute_size(&mut self) {
        self.scene.set_size(self.box_size.get());
    }

    fn output(&self) -> &OutputTarget {
        &self.output
    }

    fn output_mut(&mut self) -> &mut OutputTarget {
        &mut self.output
    }

    fn show_surface(&mut self, surface: DisplaySurface) {
        if self.showing != Some(surface) {
            log::debug!("{} ({}) now shows the {surface:?} surface", self.label, self.host);
        }
        self.showing = Some(surface);
    }

    fn on_event(&mut self, event: &ViewerEvent) {
        let ViewerEvent::Error { kind, cause } = event;
        log::warn!("{}: {kind} ({})", self.label, cause.message);
        self.context_lost = true;
    }
}
