//! Lit re-draw of the scene onto the swapchain.
//!
//! Issues the same indirect command list as the geometry pass, shades with
//! the material table and the global light, and multiplies the occlusion
//! value into the result. A mode flag swaps the shaded color for the raw
//! obscurance term when debugging.

use crate::arena::SubBuffer;
use crate::pipeline::SceneBuffers;
use crate::resources::Vertex;
use crate::targets::RenderTargets;

pub struct CompositePass {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    globals: SubBuffer,
    materials: SubBuffer,
    mode: SubBuffer,
    bind_group: wgpu::BindGroup,
}

impl CompositePass {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        targets: &RenderTargets,
        globals: SubBuffer,
        materials: SubBuffer,
        mode: SubBuffer,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Composite Shader"),
            source: wgpu::ShaderSource::Wgsl(COMPOSITE_SHADER.into()),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Composite Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
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
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
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
            label: Some("Composite Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Composite Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[Vertex::layout(), Vertex::material_id_layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let bind_group = create_bind_group(device, &layout, &globals, &materials, &mode, targets);

        Self {
            pipeline,
            layout,
            globals,
            materials,
            mode,
            bind_group,
        }
    }

    /// Rebinds the occlusion target, required after a resize.
    pub fn rebuild(&mut self, device: &wgpu::Device, targets: &RenderTargets) {
        self.bind_group = create_bind_group(
            device,
            &self.layout,
            &self.globals,
            &self.materials,
            &self.mode,
            targets,
        );
    }

    pub fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        frame_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
        scene: &SceneBuffers,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Composite Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: frame_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: 0.1,
                        g: 0.2,
                        b: 0.3,
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if scene.draw_count == 0 {
            return;
        }

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, scene.vertices.slice());
        pass.set_vertex_buffer(1, scene.material_ids.slice());
        pass.set_index_buffer(scene.indices.slice(), wgpu::IndexFormat::Uint32);
        pass.multi_draw_indexed_indirect(
            scene.draw_commands.buffer(),
            scene.draw_commands.offset(),
            scene.draw_count,
        );
    }
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    globals: &SubBuffer,
    materials: &SubBuffer,
    mode: &SubBuffer,
    targets: &RenderTargets,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Composite Inputs"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: globals.binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: materials.binding(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: mode.binding(),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::TextureView(targets.occlusion_view()),
            },
        ],
    })
}

const COMPOSITE_SHADER: &str = r#"
struct Globals {
    proj: mat4x4<f32>,
    view: mat4x4<f32>,
    inv_trans_view: mat4x4<f32>,
    eye: vec4<f32>,
    light: vec4<f32>,
    viewport: vec2<f32>,
}

struct Material {
    ambient: vec4<f32>,
    diffuse: vec4<f32>,
    specular: vec4<f32>,
}

struct ShadeMode {
    ao_only: u32,
}

@group(0) @binding(0) var<uniform> globals: Globals;
@group(0) @binding(1) var<storage, read> materials: array<Material>;
@group(0) @binding(2) var<uniform> mode: ShadeMode;
@group(0) @binding(3) var occlusion: texture_2d<f32>;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(3) material_id: u32,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) camera_position: vec3<f32>,
    @location(1) camera_normal: vec3<f32>,
    @location(2) @interpolate(flat) material_id: u32,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var output: VertexOutput;
    let view_pos = globals.view * vec4<f32>(input.position, 1.0);
    output.camera_position = view_pos.xyz;
    output.camera_normal = (globals.inv_trans_view * vec4<f32>(input.normal, 0.0)).xyz;
    output.material_id = input.material_id;
    output.clip_position = globals.proj * view_pos;
    return output;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let ao = textureLoad(occlusion, vec2<i32>(in.clip_position.xy), 0).r;
    if (mode.ao_only != 0u) {
        return vec4<f32>(ao, ao, ao, 1.0);
    }

    let material = materials[in.material_id];
    let normal = normalize(in.camera_normal);

    // Light direction is stored in world space; shading runs in camera space.
    let light_dir = normalize((globals.view * vec4<f32>(globals.light.xyz, 0.0)).xyz);
    let intensity = globals.light.w;

    let ndotl = max(dot(normal, light_dir), 0.0);

    let view_dir = normalize(-in.camera_position);
    let reflect_dir = reflect(-light_dir, normal);
    let spec_angle = max(dot(view_dir, reflect_dir), 0.0);
    let specular = pow(spec_angle, max(material.specular.w, 1.0));

    let color = material.ambient.rgb
        + material.diffuse.rgb * intensity * ndotl
        + material.specular.rgb * specular * intensity;

    return vec4<f32>(color * ao, material.diffuse.a);
}
"#;
