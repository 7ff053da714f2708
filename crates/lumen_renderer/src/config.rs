//! Camera configuration.
//!
//! The configuration is the entire tuning surface of an image: nothing
//! else influences what the camera sees. It is plain data so it can be
//! loaded from JSON, and it is validated once when the camera initializes.

use lumen_math::Vec3;
use serde::{Deserialize, Serialize};

use crate::CameraError;

/// Squared length below which a vector is treated as zero.
const DEGENERATE_EPSILON: f32 = 1e-12;

/// User-facing camera settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Ratio of image width over height
    pub aspect_ratio: f32,
    /// Rendered image width in pixels
    pub image_width: u32,
    /// Number of random samples per pixel
    pub samples_per_pixel: u32,
    /// Maximum number of ray bounces into the scene
    pub max_depth: u32,
    /// Vertical field of view in degrees
    pub vfov: f32,
    /// Point the camera is looking from
    pub look_from: Vec3,
    /// Point the camera is looking at
    pub look_at: Vec3,
    /// Camera-relative up direction
    pub vup: Vec3,
    /// Variation angle of rays through each pixel, in degrees
    pub defocus_angle: f32,
    /// Distance from look-from to the plane of perfect focus
    pub focus_dist: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            aspect_ratio: 1.0,
            image_width: 100,
            samples_per_pixel: 10,
            max_depth: 10,
            vfov: 90.0,
            look_from: Vec3::ZERO,
            look_at: Vec3::new(0.0, 0.0, -1.0),
            vup: Vec3::Y,
            defocus_angle: 0.0,
            focus_dist: 10.0,
        }
    }
}

impl CameraConfig {
    /// Image height derived from width and aspect ratio, never below one.
    pub fn image_height(&self) -> u32 {
        ((self.image_width as f32 / self.aspect_ratio).round() as u32).max(1)
    }

    /// Check the geometric preconditions the camera relies on.
    pub fn validate(&self) -> Result<(), CameraError> {
        if self.image_width == 0 {
            return Err(CameraError::ZeroWidth);
        }
        if !(self.aspect_ratio.is_finite() && self.aspect_ratio > 0.0) {
            return Err(CameraError::InvalidAspectRatio(self.aspect_ratio));
        }
        if self.samples_per_pixel == 0 {
            return Err(CameraError::ZeroSamples);
        }
        if !(self.vfov > 0.0 && self.vfov < 180.0) {
            return Err(CameraError::InvalidFieldOfView(self.vfov));
        }
        if !(self.focus_dist.is_finite() && self.focus_dist > 0.0) {
            return Err(CameraError::InvalidFocusDistance(self.focus_dist));
        }

        let view = self.look_from - self.look_at;
        if view.length_squared() < DEGENERATE_EPSILON {
            return Err(CameraError::DegenerateView);
        }
        if self.vup.cross(view.normalize()).length_squared() < DEGENERATE_EPSILON {
            return Err(CameraError::UpParallelToView);
        }

        Ok(())
    }
}
