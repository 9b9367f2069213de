//! Regenerates the position target's mip chain after the geometry pass.
//!
//! wgpu has no generateMipmap, so every level is produced by a fullscreen
//! 2x2 box average of the level above it. Only the position chain is
//! refreshed per frame; the occlusion pass reads its coarser levels for
//! samples that land far from the shaded pixel.

use crate::targets::{RenderTargets, POSITION_FORMAT};

pub struct MipChainPass {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    /// Entry i reads level i and fills level i + 1.
    bind_groups: Vec<wgpu::BindGroup>,
}

impl MipChainPass {
    pub fn new(device: &wgpu::Device, targets: &RenderTargets) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Position Downsample Shader"),
            source: wgpu::ShaderSource::Wgsl(DOWNSAMPLE_SHADER.into()),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Position Downsample Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Position Downsample Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Position Downsample Pipeline"),
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
                    format: POSITION_FORMAT,
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

        let mut pass = Self {
            pipeline,
            layout,
            bind_groups: Vec::new(),
        };
        pass.rebuild(device, targets);
        pass
    }

    /// Recreates the per-level bind groups, required after a resize.
    pub fn rebuild(&mut self, device: &wgpu::Device, targets: &RenderTargets) {
        self.bind_groups = (1..targets.mip_count())
            .map(|level| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Position Downsample Source"),
                    layout: &self.layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(
                            targets.position_mip_view(level - 1),
                        ),
                    }],
                })
            })
            .collect();
    }

    pub fn record(&self, encoder: &mut wgpu::CommandEncoder, targets: &RenderTargets) {
        for (i, bind_group) in self.bind_groups.iter().enumerate() {
            let level = i as u32 + 1;
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Position Downsample"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: targets.position_mip_view(level),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
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
}

const DOWNSAMPLE_SHADER: &str = r#"
@group(0) @binding(0) var source: texture_2d<f32>;

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> @builtin(position) vec4<f32> {
    let x = f32(vertex_index & 1u) * 2.0 - 1.0;
    let y = f32(vertex_index >> 1u) * 2.0 - 1.0;
    return vec4<f32>(x, y, 0.0, 1.0);
}

@fragment
fn fs_main(@builtin(position) position: vec4<f32>) -> @location(0) vec4<f32> {
    let limit = vec2<i32>(textureDimensions(source)) - 1;
    let base = vec2<i32>(position.xy) * 2;
    let p00 = textureLoad(source, min(base, limit), 0);
    let p10 = textureLoad(source, min(base + vec2<i32>(1, 0), limit), 0);
    let p01 = textureLoad(source, min(base + vec2<i32>(0, 1), limit), 0);
    let p11 = textureLoad(source, min(base + vec2<i32>(1, 1), limit), 0);
    return (p00 + p10 + p01 + p11) * 0.25;
}
"#;
