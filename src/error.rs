//! Viewer error type

use thiserror::Error;

/// Errors raised while setting up or running the viewer
#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("Failed to initialize GPU: {0}")]
    InitializationFailed(String),
    #[error("Failed to create surface: {0}")]
    SurfaceCreationFailed(String),
    #[error("Failed to create device: {0}")]
    DeviceCreationFailed(String),
    #[error("Failed to acquire next image: {0}")]
    AcquireImageFailed(String),
    #[error("Failed to load model '{path}': {reason}")]
    ModelLoadFailed { path: String, reason: String },
    #[error("Geometry arena exhausted: requested {requested} bytes, {remaining} remaining")]
    ArenaExhausted { requested: u64, remaining: u64 },
    #[error("Invalid allocation alignment: {0} (must be a power of two)")]
    InvalidAlignment(u64),
    #[error("Zero byte arena allocation")]
    ZeroSizeAllocation,
    #[error("Surface lost")]
    SurfaceLost,
    #[error("Out of memory")]
    OutOfMemory,
}

pub type ViewerResult<T> = Result<T, ViewerError>;
