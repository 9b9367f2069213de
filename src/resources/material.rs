//! Material parameter table

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

/// One entry of the material storage table read by the composite pass.
///
/// Classic three-term shading data: ambient and diffuse colors, specular
/// color with the shininess exponent in w.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MaterialParams {
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
}

static_assertions::const_assert_eq!(std::mem::size_of::<MaterialParams>(), 48);
static_assertions::const_assert_eq!(std::mem::offset_of!(MaterialParams, diffuse), 16);
static_assertions::const_assert_eq!(std::mem::offset_of!(MaterialParams, specular), 32);

impl MaterialParams {
    /// Derive shading terms from glTF metallic-roughness factors
    pub fn from_base_color(base_color: Vec4, metallic: f32, roughness: f32) -> Self {
        let base = Vec3::new(base_color.x, base_color.y, base_color.z);
        let specular_strength = (1.0 - roughness).max(0.0);
        let shininess = 16.0 + 112.0 * specular_strength;
        let specular = base * metallic + Vec3::splat(0.04) * (1.0 - metallic);
        Self {
            ambient: (base * 0.1).extend(1.0),
            diffuse: base.extend(base_color.w),
            specular: (specular * specular_strength).extend(shininess),
        }
    }

    /// Neutral gray used for primitives without a material
    pub fn fallback() -> Self {
        Self {
            ambient: Vec4::new(0.06, 0.06, 0.06, 1.0),
            diffuse: Vec4::new(0.6, 0.6, 0.6, 1.0),
            specular: Vec4::new(0.2, 0.2, 0.2, 32.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_base_color_keeps_albedo() {
        let params = MaterialParams::from_base_color(Vec4::new(0.8, 0.4, 0.2, 1.0), 0.0, 0.5);
        assert_eq!(params.diffuse, Vec4::new(0.8, 0.4, 0.2, 1.0));
        assert!((params.ambient.x - 0.08).abs() < 1e-6);
    }

    #[test]
    fn test_rough_material_loses_specular() {
        let params = MaterialParams::from_base_color(Vec4::ONE, 0.0, 1.0);
        assert_eq!(params.specular.x, 0.0);
        assert_eq!(params.specular.w, 16.0);
    }

    #[test]
    fn test_metallic_material_tints_specular() {
        let gold = Vec4::new(1.0, 0.77, 0.34, 1.0);
        let params = MaterialParams::from_base_color(gold, 1.0, 0.2);
        assert!(params.specular.x > params.specular.z);
    }
}
