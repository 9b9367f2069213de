//! Fullscreen ambient obscurance estimate.
//!
//! One triangle-strip draw with no vertex buffer; positions come straight
//! from the vertex index. Each pixel walks a spiral of taps around itself,
//! reading coarser position mips the farther a tap lands, and accumulates
//! how much nearby geometry closes off the hemisphere above the surface.
//! The result is deliberately noisy; the blur pass owns denoising.

use crate::arena::SubBuffer;
use crate::targets::{RenderTargets, OCCLUSION_FORMAT};

pub struct OcclusionPass {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    globals: SubBuffer,
    params: SubBuffer,
    bind_group: wgpu::BindGroup,
}

impl OcclusionPass {
    pub fn new(
        device: &wgpu::Device,
        targets: &RenderTargets,
        globals: SubBuffer,
        params: SubBuffer,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Occlusion Shader"),
            source: wgpu::ShaderSource::Wgsl(OCCLUSION_SHADER.into()),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Occlusion Layout"),
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
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
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
            label: Some("Occlusion Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Occlusion Pipeline"),
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

        let bind_group = create_bind_group(device, &layout, &globals, &params, targets);

        Self {
            pipeline,
            layout,
            globals,
            params,
            bind_group,
        }
    }

    /// Rebinds the position/normal targets, required after a resize.
    pub fn rebuild(&mut self, device: &wgpu::Device, targets: &RenderTargets) {
        self.bind_group = create_bind_group(device, &self.layout, &self.globals, &self.params, targets);
    }

    pub fn record(&self, encoder: &mut wgpu::CommandEncoder, targets: &RenderTargets) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Occlusion Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: targets.occlusion_view(),
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
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.draw(0..4, 0..1);
    }
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    globals: &SubBuffer,
    params: &SubBuffer,
    targets: &RenderTargets,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Occlusion Inputs"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: globals.binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: params.binding(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(targets.position_view()),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::TextureView(targets.normal_view()),
            },
        ],
    })
}

const OCCLUSION_SHADER: &str = r#"
struct Globals {
    proj: mat4x4<f32>,
    view: mat4x4<f32>,
    inv_trans_view: mat4x4<f32>,
    eye: vec4<f32>,
    light: vec4<f32>,
    viewport: vec2<f32>,
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

@group(0) @binding(0) var<uniform> globals: Globals;
@group(0) @binding(1) var<uniform> params: AoParams;
@group(0) @binding(2) var camera_positions: texture_2d<f32>;
@group(0) @binding(3) var camera_normals: texture_2d<f32>;

const TWO_PI: f32 = 6.28318530718;
// Taps whose screen distance exceeds 2^(mip + LOG_MAX_OFFSET) pixels move
// one level down the position chain.
const LOG_MAX_OFFSET: i32 = 3;

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> @builtin(position) vec4<f32> {
    let x = f32(vertex_index & 1u) * 2.0 - 1.0;
    let y = f32(vertex_index >> 1u) * 2.0 - 1.0;
    return vec4<f32>(x, y, 0.0, 1.0);
}

@fragment
fn fs_main(@builtin(position) frag_coord: vec4<f32>) -> @location(0) vec2<f32> {
    let pixel = vec2<i32>(frag_coord.xy);
    let center = textureLoad(camera_positions, pixel, 0);
    let position = center.xyz;

    // Derivatives are taken before any divergence so they stay defined.
    let reconstructed = normalize(cross(dpdy(position), dpdx(position)));

    if (center.w == 0.0) {
        return vec2<f32>(1.0, 0.0);
    }

    var normal = reconstructed;
    if (params.use_rendered_normals != 0u) {
        normal = textureLoad(camera_normals, pixel, 0).xyz;
    }

    // Sampling ball projected to a pixel radius at the center depth.
    let proj_scale = 0.5 * globals.viewport.y * globals.proj[1][1];
    let ss_radius = proj_scale * params.ball_radius / max(-position.z, 0.0001);

    // Per-pixel spiral rotation, constant across frames.
    let phi = f32(((3 * pixel.x) ^ (pixel.y + pixel.x * pixel.y)) * 10);

    let max_mip = i32(textureNumLevels(camera_positions)) - 1;
    let n = max(params.sample_count, 1);
    var sum = 0.0;
    for (var i = 0; i < n; i = i + 1) {
        let alpha = (f32(i) + 0.5) / f32(n);
        let angle = alpha * f32(params.turns) * TWO_PI + phi;
        let distance = alpha * ss_radius;
        let tap = frag_coord.xy + distance * vec2<f32>(cos(angle), sin(angle));

        let mip = clamp(
            i32(firstLeadingBit(u32(max(distance, 1.0)))) - LOG_MAX_OFFSET,
            0,
            max_mip,
        );
        let mip_size = vec2<i32>(textureDimensions(camera_positions, mip));
        let tap_pixel = clamp(
            vec2<i32>(tap) >> vec2<u32>(u32(mip)),
            vec2<i32>(0),
            mip_size - 1,
        );
        let tap_position = textureLoad(camera_positions, tap_pixel, mip).xyz;

        let v = tap_position - position;
        let vv = dot(v, v);
        let vn = dot(v, normal);
        sum = sum + max(0.0, vn + position.z * params.beta) / (vv + 0.01);
    }

    let ao = pow(max(0.0, 1.0 - 2.0 * params.sigma / f32(n) * sum), params.kappa);
    return vec2<f32>(ao, position.z);
}
"#;
