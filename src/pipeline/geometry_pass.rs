//! Geometry pass: camera-space position/normal targets plus scene depth.
//!
//! Every submesh is drawn by one indirect multi-draw call. The command list
//! lives in arena memory and is only rewritten when the model changes;
//! `first_instance` carries the submesh ordinal so the instance-stepped
//! material id attribute stays paired with its draw command.

use crate::arena::SubBuffer;
use crate::pipeline::SceneBuffers;
use crate::resources::{Submesh, Vertex};
use crate::targets::{RenderTargets, DEPTH_FORMAT, NORMAL_FORMAT, POSITION_FORMAT};

/// Wire format of one `multi_draw_indexed_indirect` command
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawCommand {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
    pub first_instance: u32,
}

static_assertions::const_assert_eq!(std::mem::size_of::<DrawCommand>(), 20);
static_assertions::const_assert_eq!(std::mem::offset_of!(DrawCommand, base_vertex), 12);

/// One command per submesh, ordinal position doubling as `first_instance`
pub fn build_draw_commands(submeshes: &[Submesh]) -> Vec<DrawCommand> {
    submeshes
        .iter()
        .enumerate()
        .map(|(ordinal, submesh)| DrawCommand {
            index_count: submesh.index_count,
            instance_count: 1,
            first_index: submesh.first_index,
            base_vertex: submesh.base_vertex,
            first_instance: ordinal as u32,
        })
        .collect()
}

/// Material table index per submesh, uploaded as the instance-stepped
/// stream read at vertex location 3
pub fn material_ids(submeshes: &[Submesh]) -> Vec<u32> {
    submeshes.iter().map(|s| s.material_index).collect()
}

pub struct GeometryPass {
    pipeline: wgpu::RenderPipeline,
    globals_group: wgpu::BindGroup,
}

impl GeometryPass {
    pub fn new(device: &wgpu::Device, globals: &SubBuffer) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Geometry Shader"),
            source: wgpu::ShaderSource::Wgsl(GEOMETRY_SHADER.into()),
        });

        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Geometry Globals Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let globals_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Geometry Globals"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals.binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Geometry Pipeline Layout"),
            bind_group_layouts: &[&globals_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Geometry Pipeline"),
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
                targets: &[
                    Some(wgpu::ColorTargetState {
                        format: POSITION_FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    }),
                    Some(wgpu::ColorTargetState {
                        format: NORMAL_FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    }),
                ],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        Self {
            pipeline,
            globals_group,
        }
    }

    /// Clears the targets and issues the multi-draw. A zero draw count
    /// still clears, which is all an empty scene needs.
    pub fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        targets: &RenderTargets,
        scene: &SceneBuffers,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Geometry Pass"),
            color_attachments: &[
                Some(wgpu::RenderPassColorAttachment {
                    view: targets.position_mip_view(0),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                }),
                Some(wgpu::RenderPassColorAttachment {
                    view: targets.normal_view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                }),
            ],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: targets.depth_view(),
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
        pass.set_bind_group(0, &self.globals_group, &[]);
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

const GEOMETRY_SHADER: &str = r#"
struct Globals {
    proj: mat4x4<f32>,
    view: mat4x4<f32>,
    inv_trans_view: mat4x4<f32>,
    eye: vec4<f32>,
    light: vec4<f32>,
    viewport: vec2<f32>,
}

@group(0) @binding(0) var<uniform> globals: Globals;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) camera_position: vec3<f32>,
    @location(1) camera_normal: vec3<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var output: VertexOutput;
    let view_pos = globals.view * vec4<f32>(input.position, 1.0);
    output.camera_position = view_pos.xyz;
    output.camera_normal = (globals.inv_trans_view * vec4<f32>(input.normal, 0.0)).xyz;
    output.clip_position = globals.proj * view_pos;
    return output;
}

struct FragmentOutput {
    @location(0) position: vec4<f32>,
    @location(1) normal: vec4<f32>,
}

// Alpha 1 marks covered pixels; cleared texels stay at 0 so the occlusion
// pass can tell geometry from background.
@fragment
fn fs_main(input: VertexOutput) -> FragmentOutput {
    var output: FragmentOutput;
    output.position = vec4<f32>(input.camera_position, 1.0);
    output.normal = vec4<f32>(normalize(input.camera_normal), 0.0);
    return output;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn submesh(name: &str, index_count: u32, first_index: u32, base_vertex: i32, material: u32) -> Submesh {
        Submesh {
            name: name.to_string(),
            index_count,
            first_index,
            base_vertex,
            material_index: material,
        }
    }

    #[test]
    fn test_draw_commands_carry_submesh_ordinals() {
        let submeshes = vec![
            submesh("floor", 36, 0, 0, 2),
            submesh("wall", 12, 36, 24, 0),
            submesh("column", 600, 48, 32, 2),
        ];
        let commands = build_draw_commands(&submeshes);
        assert_eq!(commands.len(), 3);
        for (i, cmd) in commands.iter().enumerate() {
            assert_eq!(cmd.instance_count, 1);
            assert_eq!(cmd.first_instance, i as u32);
        }
        assert_eq!(commands[1].index_count, 12);
        assert_eq!(commands[1].first_index, 36);
        assert_eq!(commands[2].base_vertex, 32);
    }

    #[test]
    fn test_material_ids_follow_submesh_order() {
        let submeshes = vec![
            submesh("a", 3, 0, 0, 5),
            submesh("b", 3, 3, 0, 1),
        ];
        assert_eq!(material_ids(&submeshes), vec![5, 1]);
    }

    #[test]
    fn test_empty_scene_builds_empty_lists() {
        assert!(build_draw_commands(&[]).is_empty());
        assert!(material_ids(&[]).is_empty());
    }

    #[test]
    fn test_draw_command_bytes_match_wire_layout() {
        let cmd = DrawCommand {
            index_count: 9,
            instance_count: 1,
            first_index: 3,
            base_vertex: -2,
            first_instance: 7,
        };
        let bytes = bytemuck::bytes_of(&cmd);
        assert_eq!(bytes.len(), 20);
        assert_eq!(&bytes[0..4], &9u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &(-2i32).to_le_bytes());
        assert_eq!(&bytes[16..20], &7u32.to_le_bytes());
    }
}
