//! Ambient obscurance pipeline
//!
//! The frame is built from five passes:
//! 1. Geometry pass - camera-space position/normal targets plus depth
//! 2. Mip chain - box-downsamples the position target
//! 3. Occlusion pass - fullscreen obscurance estimate from the mip chain
//! 4. Blur pass - separable edge-aware smoothing of the occlusion target
//! 5. Composite pass - re-draws the scene lit, multiplying in occlusion

pub mod blur_pass;
pub mod composite_pass;
pub mod geometry_pass;
pub mod mip_chain;
pub mod occlusion_pass;

pub use blur_pass::BlurPass;
pub use composite_pass::CompositePass;
pub use geometry_pass::GeometryPass;
pub use mip_chain::MipChainPass;
pub use occlusion_pass::OcclusionPass;

use bytemuck::{Pod, Zeroable};

/// What the composite pass puts on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Lit scene multiplied by ambient obscurance
    Full,
    /// The obscurance term alone, as grayscale
    AoOnly,
    /// Lit scene with the obscurance stages skipped
    NoAo,
}

/// Tuning knobs for the occlusion and blur passes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AoParams {
    pub use_rendered_normals: bool,
    pub sample_count: i32,
    pub turns: i32,
    pub ball_radius: f32,
    pub sigma: f32,
    pub kappa: f32,
    pub beta: f32,
    pub filter_scale: i32,
    pub edge_sharpness: f32,
}

impl Default for AoParams {
    fn default() -> Self {
        Self {
            use_rendered_normals: false,
            sample_count: 27,
            turns: 16,
            ball_radius: 3.5,
            sigma: 3.8,
            kappa: 0.8,
            beta: 0.0005,
            filter_scale: 2,
            edge_sharpness: 0.8,
        }
    }
}

impl AoParams {
    /// GPU block mirroring the shader-side AoParams struct
    pub fn uniform_data(&self) -> AoParamsUniform {
        AoParamsUniform {
            use_rendered_normals: self.use_rendered_normals as u32,
            sample_count: self.sample_count,
            turns: self.turns,
            ball_radius: self.ball_radius,
            sigma: self.sigma,
            kappa: self.kappa,
            beta: self.beta,
            filter_scale: self.filter_scale,
            edge_sharpness: self.edge_sharpness,
            _padding: [0; 3],
        }
    }
}

/// AO parameter block as laid out in the shaders.
///
/// Nine scalars padded to the 48 byte uniform struct size the WGSL side
/// rounds up to.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct AoParamsUniform {
    pub use_rendered_normals: u32,
    pub sample_count: i32,
    pub turns: i32,
    pub ball_radius: f32,
    pub sigma: f32,
    pub kappa: f32,
    pub beta: f32,
    pub filter_scale: i32,
    pub edge_sharpness: f32,
    pub _padding: [u32; 3],
}

static_assertions::const_assert_eq!(std::mem::size_of::<AoParamsUniform>(), 48);
static_assertions::const_assert_eq!(std::mem::offset_of!(AoParamsUniform, ball_radius), 12);
static_assertions::const_assert_eq!(std::mem::offset_of!(AoParamsUniform, edge_sharpness), 32);

/// Arena regions holding the uploaded model, bound by the geometry and
/// composite passes. Written once at load; the draw-command list is only
/// rewritten if the model changes.
pub struct SceneBuffers {
    pub vertices: crate::arena::SubBuffer,
    pub material_ids: crate::arena::SubBuffer,
    pub indices: crate::arena::SubBuffer,
    pub draw_commands: crate::arena::SubBuffer,
    pub draw_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = AoParams::default();
        assert!(!params.use_rendered_normals);
        assert_eq!(params.sample_count, 27);
        assert_eq!(params.turns, 16);
        assert_eq!(params.ball_radius, 3.5);
        assert_eq!(params.sigma, 3.8);
        assert_eq!(params.kappa, 0.8);
        assert_eq!(params.beta, 0.0005);
        assert_eq!(params.filter_scale, 2);
        assert_eq!(params.edge_sharpness, 0.8);
    }

    #[test]
    fn test_uniform_roundtrip_through_bytes() {
        let params = AoParams {
            use_rendered_normals: true,
            sample_count: 11,
            turns: 7,
            ball_radius: 1.25,
            sigma: 2.0,
            kappa: 0.5,
            beta: 0.001,
            filter_scale: 3,
            edge_sharpness: 4.0,
        };
        let uniform = params.uniform_data();
        let bytes = bytemuck::bytes_of(&uniform);
        assert_eq!(bytes.len(), 48);
        let back: AoParamsUniform = bytemuck::pod_read_unaligned(bytes);
        assert_eq!(back, uniform);
        assert_eq!(back.use_rendered_normals, 1);
        assert_eq!(back.sample_count, 11);
        assert_eq!(back.edge_sharpness, 4.0);
    }
}
