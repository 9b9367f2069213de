//! Separable edge-aware blur over the occlusion target.
//!
//! One shader run twice: horizontally into the scratch target, then
//! vertically back into the occlusion target. Taps are spaced
//! `filter_scale` pixels apart and lose weight with depth distance from
//! the center pixel, so occlusion never bleeds across silhouettes. The
//! whole stage is skippable; the composite then reads the raw estimate.

use crate::arena::{GpuArena, SubBuffer};
use crate::error::ViewerResult;
use crate::targets::{RenderTargets, OCCLUSION_FORMAT};

pub struct BlurPass {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    params: SubBuffer,
    horizontal_axis: SubBuffer,
    vertical_axis: SubBuffer,
    /// occlusion -> scratch
    horizontal_group: wgpu::BindGroup,
    /// scratch -> occlusion
    vertical_group: wgpu::BindGroup,
}

impl BlurPass {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        arena: &mut GpuArena,
        params: SubBuffer,
        targets: &RenderTargets,
    ) -> ViewerResult<Self> {
        let horizontal_axis = arena.allocate_uniform(8)?;
        horizontal_axis.write(queue, &[1i32, 0i32]);
        let vertical_axis = arena.allocate_uniform(8)?;
        vertical_axis.write(queue, &[0i32, 1i32]);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Blur Shader"),
            source: wgpu::ShaderSource::Wgsl(BLUR_SHADER.into()),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Blur Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Blur Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Blur Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: OCCLUSION_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let horizontal_group = create_bind_group(
            device,
            &layout,
            &horizontal_axis,
            &params,
            targets.occlusion_view(),
        );
        let vertical_group = create_bind_group(
            device,
            &layout,
            &vertical_axis,
            &params,
            targets.scratch_view(),
        );

        Ok(Self {
            pipeline,
            layout,
            params,
            horizontal_axis,
            vertical_axis,
            horizontal_group,
            vertical_group,
        })
    }

    /// Rebinds the occlusion/scratch targets, required after a resize.
    pub fn rebuild(&mut self, device: &wgpu::Device, targets: &RenderTargets) {
        self.horizontal_group = create_bind_group(
            device,
            &self.layout,
            &self.horizontal_axis,
            &self.params,
            targets.occlusion_view(),
        );
        self.vertical_group = create_bind_group(
            device,
            &self.layout,
            &self.vertical_axis,
            &self.params,
            targets.scratch_view(),
        );
    }

    pub fn record(&self, encoder: &mut wgpu::CommandEncoder, targets: &RenderTargets) {
        self.record_axis(
            encoder,
            "Blur Horizontal",
            targets.scratch_view(),
            &self.horizontal_group,
        );
        self.record_axis(
            encoder,
            "Blur Vertical",
            targets.occlusion_view(),
            &self.vertical_group,
        );
    }

    fn record_axis(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        label: &str,
        attachment: &wgpu::TextureView,
        bind_group: &wgpu::BindGroup,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: attachment,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::WHITE),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..4, 0..1);
    }
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    axis: &SubBuffer,
    params: &SubBuffer,
    source: &wgpu::TextureView,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Blur Inputs"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: axis.binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: params.binding(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(source),
            },
        ],
    })
}

const BLUR_SHADER: &str = r#"
struct BlurAxis {
    axis: vec2<i32>,
}

struct AoParams {
    use_rendered_normals: u32,
    sample_count: i32,
    turns: i32,
    ball_radius: f32,
    sigma: f32,
    kappa: f32,
    beta: f32,
    filter_scale: i32,
    edge_sharpness: f32,
}

@group(0) @binding(0) var<uniform> blur: BlurAxis;
@group(0) @binding(1) var<uniform> params: AoParams;
@group(0) @binding(2) var source: texture_2d<f32>;

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> @builtin(position) vec4<f32> {
    let x = f32(vertex_index & 1u) * 2.0 - 1.0;
    let y = f32(vertex_index >> 1u) * 2.0 - 1.0;
    return vec4<f32>(x, y, 0.0, 1.0);
}

@fragment
fn fs_main(@builtin(position) frag_coord: vec4<f32>) -> @location(0) vec2<f32> {
    let pixel = vec2<i32>(frag_coord.xy);
    let limit = vec2<i32>(textureDimensions(source)) - 1;
    let center = textureLoad(source, pixel, 0);
    let key = center.g;

    var sum = center.r;
    var total_weight = 1.0;
    for (var r = -4; r <= 4; r = r + 1) {
        if (r == 0) {
            continue;
        }
        let tap_pixel = clamp(
            pixel + blur.axis * (r * params.filter_scale),
            vec2<i32>(0),
            limit,
        );
        let tap = textureLoad(source, tap_pixel, 0);
        let gaussian = exp(-f32(r * r) / 8.0);
        let edge = max(0.0, 1.0 - params.edge_sharpness * abs(tap.g - key));
        let weight = gaussian * edge;
        sum = sum + tap.r * weight;
        total_weight = total_weight + weight;
    }

    return vec2<f32>(sum / total_weight, key);
}
"#;
