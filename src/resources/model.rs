//! glTF model loading
//!
//! The whole file is flattened into one vertex stream and one index stream,
//! with node transforms baked in. Each primitive becomes a submesh addressed
//! by base vertex and first index, which is exactly the shape the indirect
//! draw commands consume.

use crate::error::{ViewerError, ViewerResult};
use crate::resources::MaterialParams;
use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use std::path::Path;

/// Interleaved vertex as stored in the arena
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

static_assertions::const_assert_eq!(std::mem::size_of::<Vertex>(), 32);
static_assertions::const_assert_eq!(std::mem::offset_of!(Vertex, normal), 12);
static_assertions::const_assert_eq!(std::mem::offset_of!(Vertex, uv), 24);

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] = [
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x3,
            offset: 0,
            shader_location: 0,
        },
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x3,
            offset: 12,
            shader_location: 1,
        },
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x2,
            offset: 24,
            shader_location: 2,
        },
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }

    /// Layout for the per-submesh material id stream, advanced per instance
    /// so that `first_instance` in the draw command selects the entry.
    pub fn material_id_layout() -> wgpu::VertexBufferLayout<'static> {
        const MATERIAL_ID: [wgpu::VertexAttribute; 1] = [wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Uint32,
            offset: 0,
            shader_location: 3,
        }];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<u32>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &MATERIAL_ID,
        }
    }
}

/// One indirect-drawable slice of the flattened streams
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submesh {
    pub name: String,
    pub index_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
    pub material_index: u32,
}

/// A loaded model: flattened geometry, submesh table, material table
#[derive(Debug, Default)]
pub struct Model {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub submeshes: Vec<Submesh>,
    pub materials: Vec<MaterialParams>,
}

impl Model {
    pub fn load(path: &Path) -> ViewerResult<Self> {
        let (document, buffers, _images) =
            gltf::import(path).map_err(|e| ViewerError::ModelLoadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let mut materials: Vec<MaterialParams> = document
            .materials()
            .map(|material| {
                let pbr = material.pbr_metallic_roughness();
                MaterialParams::from_base_color(
                    Vec4::from_array(pbr.base_color_factor()),
                    pbr.metallic_factor(),
                    pbr.roughness_factor(),
                )
            })
            .collect();

        // Extra slot for primitives that reference no material
        let fallback_index = materials.len() as u32;
        materials.push(MaterialParams::fallback());

        let mut model = Model {
            materials,
            ..Model::default()
        };

        let scene = document.default_scene().or_else(|| document.scenes().next());
        if let Some(scene) = scene {
            for node in scene.nodes() {
                model.append_node(&node, Mat4::IDENTITY, &buffers, fallback_index);
            }
        }

        log::info!(
            "Loaded '{}': {} submeshes, {} vertices, {} indices, {} materials",
            path.display(),
            model.submeshes.len(),
            model.vertices.len(),
            model.indices.len(),
            model.materials.len()
        );

        Ok(model)
    }

    fn append_node(
        &mut self,
        node: &gltf::Node,
        parent: Mat4,
        buffers: &[gltf::buffer::Data],
        fallback_index: u32,
    ) {
        let transform = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

        if let Some(mesh) = node.mesh() {
            let mesh_name = mesh
                .name()
                .map(String::from)
                .unwrap_or_else(|| format!("mesh{}", mesh.index()));
            for (prim_idx, primitive) in mesh.primitives().enumerate() {
                let name = if prim_idx == 0 {
                    mesh_name.clone()
                } else {
                    format!("{}.{}", mesh_name, prim_idx)
                };
                self.append_primitive(name, &primitive, transform, buffers, fallback_index);
            }
        }

        for child in node.children() {
            self.append_node(&child, transform, buffers, fallback_index);
        }
    }

    fn append_primitive(
        &mut self,
        name: String,
        primitive: &gltf::Primitive,
        transform: Mat4,
        buffers: &[gltf::buffer::Data],
        fallback_index: u32,
    ) {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::warn!("Skipping non-triangle primitive '{}'", name);
            return;
        }

        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));
        let Some(positions) = reader.read_positions() else {
            log::warn!("Skipping primitive '{}' without positions", name);
            return;
        };

        let base_vertex = self.vertices.len();
        let first_index = self.indices.len();
        let normal_matrix = Mat3::from_mat4(transform.inverse().transpose());

        for position in positions {
            self.vertices.push(Vertex {
                position: transform.transform_point3(Vec3::from_array(position)),
                normal: Vec3::ZERO,
                uv: Vec2::ZERO,
            });
        }
        let vertex_count = self.vertices.len() - base_vertex;

        let mut has_normals = false;
        if let Some(normals) = reader.read_normals() {
            for (vertex, normal) in self.vertices[base_vertex..].iter_mut().zip(normals) {
                vertex.normal = (normal_matrix * Vec3::from_array(normal)).normalize_or_zero();
            }
            has_normals = true;
        }
        if let Some(uvs) = reader.read_tex_coords(0) {
            for (vertex, uv) in self.vertices[base_vertex..].iter_mut().zip(uvs.into_f32()) {
                vertex.uv = Vec2::from_array(uv);
            }
        }

        match reader.read_indices() {
            Some(indices) => self.indices.extend(indices.into_u32()),
            None => self.indices.extend(0..vertex_count as u32),
        }

        if !has_normals {
            compute_smooth_normals(
                &mut self.vertices[base_vertex..],
                &self.indices[first_index..],
            );
        }

        self.submeshes.push(Submesh {
            name,
            index_count: (self.indices.len() - first_index) as u32,
            first_index: first_index as u32,
            base_vertex: base_vertex as i32,
            material_index: primitive
                .material()
                .index()
                .map(|i| i as u32)
                .unwrap_or(fallback_index),
        });
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// Area-weighted vertex normals for primitives that ship without them.
/// Indices are local to the vertex slice.
fn compute_smooth_normals(vertices: &mut [Vertex], indices: &[u32]) {
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let edge1 = vertices[b].position - vertices[a].position;
        let edge2 = vertices[c].position - vertices[a].position;
        let face_normal = edge1.cross(edge2);
        vertices[a].normal += face_normal;
        vertices[b].normal += face_normal;
        vertices[c].normal += face_normal;
    }
    for vertex in vertices.iter_mut() {
        vertex.normal = vertex.normal.normalize_or_zero();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_quad() -> (Vec<Vertex>, Vec<u32>) {
        let positions = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, -1.0),
            Vec3::new(0.0, 0.0, -1.0),
        ];
        let vertices = positions
            .iter()
            .map(|&position| Vertex {
                position,
                normal: Vec3::ZERO,
                uv: Vec2::ZERO,
            })
            .collect();
        (vertices, vec![0, 1, 2, 0, 2, 3])
    }

    #[test]
    fn test_smooth_normals_flat_quad() {
        let (mut vertices, indices) = flat_quad();
        compute_smooth_normals(&mut vertices, &indices);
        for vertex in &vertices {
            assert!((vertex.normal - Vec3::Y).length() < 1e-6);
        }
    }

    #[test]
    fn test_smooth_normals_unreferenced_vertex_stays_zero() {
        let (mut vertices, _) = flat_quad();
        compute_smooth_normals(&mut vertices, &[0, 1, 2]);
        assert_eq!(vertices[3].normal, Vec3::ZERO);
    }

    #[test]
    fn test_empty_model_has_no_geometry() {
        let model = Model::default();
        assert!(model.submeshes.is_empty());
        assert!(model.vertex_bytes().is_empty());
        assert!(model.index_bytes().is_empty());
    }
}
