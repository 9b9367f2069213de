//! Camera controller system
//!
//! Two control schemes over the same camera:
//! - FreeFly: WASD movement, mouse look, scroll speed
//! - Orbit: rotate around a target point
//!
//! `update` reports whether the view actually changed so callers can skip
//! re-uploading view-dependent uniforms on idle frames.

use glam::{Vec2, Vec3};

use super::Camera;

/// Input state for camera controllers
#[derive(Debug, Clone, Default)]
pub struct CameraInput {
    /// Movement keys (WASD, QE for up/down)
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,

    /// Sprint modifier (shift)
    pub sprint: bool,

    /// Mouse delta since last frame (in pixels)
    pub mouse_delta: Vec2,

    /// Mouse scroll delta (positive = scroll up)
    pub scroll_delta: f32,

    /// Whether mouse look is active (right mouse button held)
    pub mouse_look_active: bool,
}

impl CameraInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset per-frame deltas (call after update)
    pub fn reset_deltas(&mut self) {
        self.mouse_delta = Vec2::ZERO;
        self.scroll_delta = 0.0;
    }
}

/// Abstract camera controller trait
pub trait CameraController {
    /// Update the camera based on input and delta time. Returns true if
    /// the view changed.
    fn update(&mut self, camera: &mut Camera, input: &CameraInput, dt: f32) -> bool;

    /// Controller name for the overlay and window title
    fn name(&self) -> &'static str;

    /// Initialize controller state from the camera's current pose
    fn sync_with_camera(&mut self, camera: &Camera);
}

/// Free-fly camera controller (FPS-style)
///
/// - WASD: Move forward/backward/left/right
/// - QE or Space/Ctrl: Move up/down
/// - Mouse: Look around (when mouse_look_active)
/// - Scroll: Adjust movement speed
/// - Shift: Sprint (2x speed)
pub struct FreeFlyController {
    /// Current yaw angle (horizontal rotation) in radians
    pub yaw: f32,
    /// Current pitch angle (vertical rotation) in radians
    pub pitch: f32,
    /// Base movement speed in units per second
    pub move_speed: f32,
    /// Minimum movement speed
    pub min_speed: f32,
    /// Maximum movement speed
    pub max_speed: f32,
    /// Mouse sensitivity (radians per pixel)
    pub mouse_sensitivity: f32,
    /// Speed multiplier when sprinting
    pub sprint_multiplier: f32,
    /// Speed change per scroll unit
    pub scroll_speed_factor: f32,
}

impl Default for FreeFlyController {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            move_speed: 25.0,
            min_speed: 1.0,
            max_speed: 200.0,
            mouse_sensitivity: 0.003,
            sprint_multiplier: 2.0,
            scroll_speed_factor: 1.2,
        }
    }
}

impl FreeFlyController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom speed settings
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.move_speed = speed;
        self
    }

    /// Get the forward direction based on yaw/pitch
    fn forward_direction(&self) -> Vec3 {
        Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            -self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize()
    }

    /// Get the right direction (perpendicular to forward, on XZ plane)
    fn right_direction(&self) -> Vec3 {
        Vec3::new(-self.yaw.sin(), 0.0, self.yaw.cos()).normalize()
    }
}

impl CameraController for FreeFlyController {
    fn update(&mut self, camera: &mut Camera, input: &CameraInput, dt: f32) -> bool {
        let old_position = camera.position;
        let old_target = camera.target;

        // Scroll wheel adjusts speed
        if input.scroll_delta != 0.0 {
            if input.scroll_delta > 0.0 {
                self.move_speed *= self.scroll_speed_factor;
            } else {
                self.move_speed /= self.scroll_speed_factor;
            }
            self.move_speed = self.move_speed.clamp(self.min_speed, self.max_speed);
        }

        // Mouse look
        if input.mouse_look_active && input.mouse_delta != Vec2::ZERO {
            self.yaw += input.mouse_delta.x * self.mouse_sensitivity;
            self.pitch += input.mouse_delta.y * self.mouse_sensitivity;

            // Clamp pitch to avoid gimbal lock
            let max_pitch = std::f32::consts::FRAC_PI_2 - 0.01;
            self.pitch = self.pitch.clamp(-max_pitch, max_pitch);

            self.yaw %= 2.0 * std::f32::consts::PI;
        }

        // Movement direction
        let forward = self.forward_direction();
        let right = self.right_direction();
        let up = Vec3::Y;

        let mut velocity = Vec3::ZERO;

        if input.forward {
            velocity += forward;
        }
        if input.backward {
            velocity -= forward;
        }
        if input.right {
            velocity += right;
        }
        if input.left {
            velocity -= right;
        }
        if input.up {
            velocity += up;
        }
        if input.down {
            velocity -= up;
        }

        // Normalize if moving diagonally
        if velocity.length_squared() > 0.0 {
            velocity = velocity.normalize();
        }

        let speed = if input.sprint {
            self.move_speed * self.sprint_multiplier
        } else {
            self.move_speed
        };

        camera.position += velocity * speed * dt;
        camera.target = camera.position + forward;

        camera.position != old_position || camera.target != old_target
    }

    fn name(&self) -> &'static str {
        "FreeFly"
    }

    fn sync_with_camera(&mut self, camera: &Camera) {
        let forward = (camera.target - camera.position).normalize();
        self.yaw = forward.z.atan2(forward.x);
        self.pitch = (-forward.y).asin();
    }
}

/// Orbit camera controller
///
/// Rotates around a target point at a fixed distance.
/// - Mouse drag: Orbit around target
/// - Scroll: Zoom in/out (change distance)
/// - WASD: Pan the target point
pub struct OrbitController {
    /// Target point to orbit around
    pub target: Vec3,
    /// Distance from target
    pub distance: f32,
    /// Minimum distance
    pub min_distance: f32,
    /// Maximum distance
    pub max_distance: f32,
    /// Current azimuth angle (horizontal) in radians
    pub azimuth: f32,
    /// Current elevation angle (vertical) in radians
    pub elevation: f32,
    /// Minimum elevation
    pub min_elevation: f32,
    /// Maximum elevation
    pub max_elevation: f32,
    /// Orbit sensitivity (radians per pixel)
    pub orbit_sensitivity: f32,
    /// Zoom factor per scroll unit
    pub zoom_factor: f32,
    /// Pan speed for moving target
    pub pan_speed: f32,
}

impl Default for OrbitController {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 100.0,
            min_distance: 2.0,
            max_distance: 500.0,
            azimuth: 0.0,
            elevation: 0.0,
            min_elevation: -std::f32::consts::FRAC_PI_2 + 0.05,
            max_elevation: std::f32::consts::FRAC_PI_2 - 0.05,
            orbit_sensitivity: 0.005,
            zoom_factor: 1.1,
            pan_speed: 25.0,
        }
    }
}

impl OrbitController {
    pub fn new(target: Vec3, distance: f32) -> Self {
        Self {
            target,
            distance,
            ..Default::default()
        }
    }

    /// Calculate camera position from orbit parameters
    fn calculate_position(&self) -> Vec3 {
        let x = self.distance * self.elevation.cos() * self.azimuth.cos();
        let y = self.distance * self.elevation.sin();
        let z = self.distance * self.elevation.cos() * self.azimuth.sin();
        self.target + Vec3::new(x, y, z)
    }

    /// Right direction for panning (on XZ plane based on azimuth)
    fn right_direction(&self) -> Vec3 {
        Vec3::new(-self.azimuth.sin(), 0.0, self.azimuth.cos()).normalize()
    }

    /// Forward direction for panning (on XZ plane, toward target)
    fn forward_direction(&self) -> Vec3 {
        Vec3::new(self.azimuth.cos(), 0.0, self.azimuth.sin()).normalize()
    }
}

impl CameraController for OrbitController {
    fn update(&mut self, camera: &mut Camera, input: &CameraInput, dt: f32) -> bool {
        let old_position = camera.position;
        let old_target = camera.target;

        // Scroll wheel zooms
        if input.scroll_delta != 0.0 {
            if input.scroll_delta > 0.0 {
                self.distance /= self.zoom_factor;
            } else {
                self.distance *= self.zoom_factor;
            }
            self.distance = self.distance.clamp(self.min_distance, self.max_distance);
        }

        // Mouse orbit
        if input.mouse_look_active && input.mouse_delta != Vec2::ZERO {
            self.azimuth += input.mouse_delta.x * self.orbit_sensitivity;
            self.elevation += input.mouse_delta.y * self.orbit_sensitivity;

            self.elevation = self.elevation.clamp(self.min_elevation, self.max_elevation);
            self.azimuth %= 2.0 * std::f32::consts::PI;
        }

        // Pan with WASD
        let forward = self.forward_direction();
        let right = self.right_direction();

        let mut pan = Vec3::ZERO;

        if input.forward {
            pan -= forward;
        }
        if input.backward {
            pan += forward;
        }
        if input.right {
            pan += right;
        }
        if input.left {
            pan -= right;
        }
        if input.up {
            pan += Vec3::Y;
        }
        if input.down {
            pan -= Vec3::Y;
        }

        if pan.length_squared() > 0.0 {
            pan = pan.normalize();
            let speed = if input.sprint {
                self.pan_speed * 2.0
            } else {
                self.pan_speed
            };
            self.target += pan * speed * dt;
        }

        camera.position = self.calculate_position();
        camera.target = self.target;

        camera.position != old_position || camera.target != old_target
    }

    fn name(&self) -> &'static str {
        "Orbit"
    }

    fn sync_with_camera(&mut self, camera: &Camera) {
        self.target = camera.target;
        let offset = camera.position - camera.target;
        self.distance = offset.length().max(self.min_distance);
        self.elevation = (offset.y / self.distance)
            .clamp(-1.0, 1.0)
            .asin()
            .clamp(self.min_elevation, self.max_elevation);
        self.azimuth = offset.z.atan2(offset.x);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_input_reports_no_change() {
        let mut camera = Camera::default();
        let mut controller = FreeFlyController::new();
        controller.sync_with_camera(&camera);
        let input = CameraInput::new();
        // First tick may settle target onto position + forward
        controller.update(&mut camera, &input, 1.0 / 60.0);
        let changed = controller.update(&mut camera, &input, 1.0 / 60.0);
        assert!(!changed);
    }

    #[test]
    fn test_movement_reports_change() {
        let mut camera = Camera::default();
        let mut controller = FreeFlyController::new();
        controller.sync_with_camera(&camera);
        let input = CameraInput {
            forward: true,
            ..CameraInput::new()
        };
        let before = camera.position;
        let changed = controller.update(&mut camera, &input, 1.0 / 60.0);
        assert!(changed);
        assert_ne!(camera.position, before);
    }

    #[test]
    fn test_mouse_look_ignored_when_inactive() {
        let mut camera = Camera::default();
        let mut controller = FreeFlyController::new();
        controller.sync_with_camera(&camera);
        let input = CameraInput::new();
        controller.update(&mut camera, &input, 1.0 / 60.0);

        let input = CameraInput {
            mouse_delta: Vec2::new(40.0, 10.0),
            mouse_look_active: false,
            ..CameraInput::new()
        };
        let changed = controller.update(&mut camera, &input, 1.0 / 60.0);
        assert!(!changed);
    }

    #[test]
    fn test_orbit_keeps_distance_while_rotating() {
        let mut camera = Camera::default();
        let mut controller = OrbitController::default();
        controller.sync_with_camera(&camera);
        let input = CameraInput {
            mouse_delta: Vec2::new(25.0, -10.0),
            mouse_look_active: true,
            ..CameraInput::new()
        };
        let changed = controller.update(&mut camera, &input, 1.0 / 60.0);
        assert!(changed);
        let distance = (camera.position - camera.target).length();
        assert!((distance - controller.distance).abs() < 1e-3);
    }

    #[test]
    fn test_orbit_zoom_clamped() {
        let mut camera = Camera::default();
        let mut controller = OrbitController::new(Vec3::ZERO, 10.0);
        let input = CameraInput {
            scroll_delta: 1.0,
            ..CameraInput::new()
        };
        for _ in 0..200 {
            controller.update(&mut camera, &input, 1.0 / 60.0);
        }
        assert!(controller.distance >= controller.min_distance);
    }

    #[test]
    fn test_freefly_pitch_clamped() {
        let mut camera = Camera::default();
        let mut controller = FreeFlyController::new();
        controller.sync_with_camera(&camera);
        let input = CameraInput {
            mouse_delta: Vec2::new(0.0, 10000.0),
            mouse_look_active: true,
            ..CameraInput::new()
        };
        controller.update(&mut camera, &input, 1.0 / 60.0);
        assert!(controller.pitch < std::f32::consts::FRAC_PI_2);
        assert!(camera.forward().is_finite());
    }
}
