//! Camera and per-frame globals

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3, Vec4};

/// Directional light shared by every frame: direction toward the light
/// (world space, normalized at upload) and intensity in w.
const LIGHT_DIRECTION: Vec3 = Vec3::new(0.0, 1.0, -1.0);
const LIGHT_INTENSITY: f32 = 0.65;

/// Perspective projection parameters
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            fov_y: 75.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 1.0,
            far: 1000.0,
        }
    }
}

impl Projection {
    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }
}

/// Camera for viewing the scene
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub projection: Projection,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(100.0, 50.0, 0.0),
            target: Vec3::new(0.0, 50.0, 0.0),
            up: Vec3::Y,
            projection: Projection::default(),
        }
    }
}

impl Camera {
    pub fn new(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            target,
            up: Vec3::Y,
            projection: Projection::default(),
        }
    }

    /// Get the view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Get the projection matrix
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.matrix()
    }

    /// Get the forward direction
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize()
    }

    /// Build the per-frame globals block for shaders
    pub fn globals(&self, viewport: Vec2) -> GlobalsUniform {
        let view = self.view_matrix();
        GlobalsUniform {
            proj: self.projection_matrix(),
            view,
            inv_trans_view: view.transpose().inverse(),
            eye: self.position.extend(1.0),
            light: LIGHT_DIRECTION.normalize().extend(LIGHT_INTENSITY),
            viewport,
            _padding: Vec2::ZERO,
        }
    }

    /// Update aspect ratio after a resize
    pub fn set_aspect(&mut self, width: f32, height: f32) {
        self.projection.aspect = width / height;
    }
}

/// Per-frame globals as laid out in the shaders
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GlobalsUniform {
    pub proj: Mat4,
    pub view: Mat4,
    pub inv_trans_view: Mat4,
    pub eye: Vec4,
    pub light: Vec4,
    pub viewport: Vec2,
    pub _padding: Vec2,
}

static_assertions::const_assert_eq!(std::mem::size_of::<GlobalsUniform>(), 240);
static_assertions::const_assert_eq!(std::mem::offset_of!(GlobalsUniform, eye), 192);
static_assertions::const_assert_eq!(std::mem::offset_of!(GlobalsUniform, viewport), 224);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_globals_deterministic_for_static_camera() {
        let camera = Camera::default();
        let a = camera.globals(Vec2::new(1280.0, 720.0));
        let b = camera.globals(Vec2::new(1280.0, 720.0));
        assert_eq!(bytemuck::bytes_of(&a), bytemuck::bytes_of(&b));
    }

    #[test]
    fn test_globals_eye_matches_camera_position() {
        let camera = Camera::new(Vec3::new(3.0, -2.0, 7.5), Vec3::ZERO);
        let globals = camera.globals(Vec2::new(100.0, 100.0));
        assert_eq!(globals.eye, Vec4::new(3.0, -2.0, 7.5, 1.0));
    }

    #[test]
    fn test_inverse_transpose_view() {
        let camera = Camera::default();
        let globals = camera.globals(Vec2::new(1280.0, 720.0));
        let product = globals.inv_trans_view * globals.view.transpose();
        let identity = Mat4::IDENTITY;
        for col in 0..4 {
            let diff = product.col(col) - identity.col(col);
            assert!(diff.length() < 1e-4, "column {} differs: {:?}", col, diff);
        }
    }

    #[test]
    fn test_light_is_normalized() {
        let globals = Camera::default().globals(Vec2::ONE);
        let dir = Vec3::new(globals.light.x, globals.light.y, globals.light.z);
        assert!((dir.length() - 1.0).abs() < 1e-6);
        assert_eq!(globals.light.w, 0.65);
    }

    #[test]
    fn test_default_view_looks_along_negative_x() {
        let camera = Camera::default();
        let forward = camera.forward();
        assert!((forward - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-6);
    }
}
