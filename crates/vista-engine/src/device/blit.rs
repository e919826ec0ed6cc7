use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::coords::{PhysicalSize, PixelRect};

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct BlitUniform {
    /// u0, v0, u1, v1
    src: [f32; 4],
}

/// Where a composite lands and which source texels feed it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct BlitMapping {
    /// Destination rectangle, clipped to the target.
    pub dest: PixelRect,
    pub uv: [f32; 4],
}

/// Maps `region` of a `source`-sized texture onto `dest` inside a
/// `target`-sized surface. Parts of `dest` outside the target are cut off
/// together with the matching source texels.
pub(crate) fn blit_mapping(
    region: PixelRect,
    source: PhysicalSize<u32>,
    dest: PixelRect,
    target: PhysicalSize<u32>,
) -> Option<BlitMapping> {
    let region = region.clamped_to(source);
    let clipped = dest.clamped_to(target);
    if region.is_empty() || clipped.is_empty() || dest.is_empty() {
        return None;
    }

    let fx0 = (clipped.x - dest.x) as f32 / dest.width as f32;
    let fx1 = (clipped.right() - dest.x) as f32 / dest.width as f32;
    let fy0 = (clipped.y - dest.y) as f32 / dest.height as f32;
    let fy1 = (clipped.top() - dest.y) as f32 / dest.height as f32;

    let (sw, sh) = (source.width as f32, source.height as f32);
    let (rx, ry) = (region.x as f32, region.y as f32);
    let (rw, rh) = (region.width as f32, region.height as f32);

    Some(BlitMapping {
        dest: clipped,
        uv: [
            (rx + fx0 * rw) / sw,
            (ry + fy0 * rh) / sh,
            (rx + fx1 * rw) / sw,
            (ry + fy1 * rh) / sh,
        ],
    })
}

/// Draws texture regions into a render pass with linear filtering.
///
/// Used to composite display sources (the shared surface or a private
/// output) onto the page at each widget's position and size.
#[derive(Default)]
pub(crate) struct Blitter {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group_layout: Option<wgpu::BindGroupLayout>,
    sampler: Option<wgpu::Sampler>,
}

impl Blitter {
    pub fn ensure_pipeline(&mut self, device: &wgpu::Device, format: wgpu::TextureFormat) {
        if self.pipeline_format == Some(format) && self.pipeline.is_some() {
            return;
        }

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("vista blit shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/blit.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vista blit bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<BlitUniform>() as u64,
                        ),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("vista blit pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("vista blit pipeline"),
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
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("vista blit sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        self.pipeline_format = Some(format);
        self.pipeline = Some(pipeline);
        self.bind_group_layout = Some(bind_group_layout);
        self.sampler = Some(sampler);
    }

    /// Records one composite. Call [`Blitter::ensure_pipeline`] first.
    pub fn draw(
        &self,
        device: &wgpu::Device,
        pass: &mut wgpu::RenderPass<'_>,
        source: &wgpu::TextureView,
        mapping: BlitMapping,
    ) {
        let (Some(pipeline), Some(layout), Some(sampler)) = (
            self.pipeline.as_ref(),
            self.bind_group_layout.as_ref(),
            self.sampler.as_ref(),
        ) else {
            return;
        };

        let uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("vista blit ubo"),
            contents: bytemuck::bytes_of(&BlitUniform { src: mapping.uv }),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("vista blit bind group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(source),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        let d = mapping.dest;
        pass.set_viewport(d.x as f32, d.y as f32, d.width as f32, d.height as f32, 0.0, 1.0);
        pass.set_scissor_rect(d.x, d.y, d.width, d.height);
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..6, 0..1);
    }
}
