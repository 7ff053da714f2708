//! Error types for camera setup and rendering.

use std::io;

use thiserror::Error;

/// A camera configuration that violates a geometric precondition.
///
/// These are detected once, when the camera is initialized, and never
/// inside the per-sample hot path.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CameraError {
    #[error("image width must be at least one pixel")]
    ZeroWidth,

    #[error("aspect ratio must be positive and finite, got {0}")]
    InvalidAspectRatio(f32),

    #[error("samples per pixel must be greater than zero")]
    ZeroSamples,

    #[error("vertical field of view must be in (0, 180) degrees, got {0}")]
    InvalidFieldOfView(f32),

    #[error("focus distance must be positive and finite, got {0}")]
    InvalidFocusDistance(f32),

    #[error("look-from and look-at are the same point")]
    DegenerateView,

    #[error("up vector is zero or parallel to the view direction")]
    UpParallelToView,
}

/// Errors that can abort a render.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid camera: {0}")]
    Camera(#[from] CameraError),

    #[error("failed to build render thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("IO error: {0}")]
    Output(#[from] io::Error),

    #[error("image encoding error: {0}")]
    Image(#[from] image::ImageError),
}
