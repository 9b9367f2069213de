//! Interactive glTF viewer with scalable ambient obscurance.
//!
//! The renderer runs a fixed five-stage pipeline on wgpu:
//! - Geometry pass filling camera-space position and normal targets
//! - Position mip chain reduction for wide-radius sampling
//! - Screen-space obscurance estimation
//! - Separable edge-aware blur
//! - Lit composite that modulates shading by the obscurance term
//!
//! Geometry lives in one arena buffer and draws through a single
//! multi-draw-indirect call; an egui overlay edits the estimator
//! parameters live.

pub mod arena;
pub mod error;
pub mod gpu;
pub mod input;
pub mod overlay;
pub mod pipeline;
pub mod resources;
pub mod scene;
pub mod targets;
pub mod viewer;

pub use arena::{GpuArena, SubBuffer, DEFAULT_ARENA_CAPACITY};
pub use error::{ViewerError, ViewerResult};
pub use gpu::GpuContext;
pub use input::{ControlAction, ControlState};
pub use pipeline::{AoParams, RenderMode};
pub use viewer::Viewer;

/// Configuration for opening the viewer window and device.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Window title
    pub title: String,
    /// Initial window width
    pub width: u32,
    /// Initial window height
    pub height: u32,
    /// Enable vsync
    pub vsync: bool,
    /// Size of the geometry arena in bytes
    pub arena_capacity: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "Ambient Obscurance Viewer".to_string(),
            width: 1280,
            height: 720,
            vsync: true,
            arena_capacity: DEFAULT_ARENA_CAPACITY,
        }
    }
}
