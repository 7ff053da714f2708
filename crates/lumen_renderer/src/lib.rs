//! Lumen Renderer - CPU Path Tracing
//!
//! A Monte Carlo path tracer: a thin-lens camera generates jittered rays,
//! a recursive integrator turns each ray into radiance, and every pixel's
//! samples are reduced in parallel on a fixed-size rayon pool before the
//! pixel is handed to an output sink in scanline order.

mod camera;
mod config;
mod error;
mod hittable;
mod material;
mod output;
mod renderer;
mod sampling;
mod sphere;

pub use camera::Camera;
pub use config::CameraConfig;
pub use error::{CameraError, RenderError};
pub use hittable::{HitRecord, Hittable, HittableList};
pub use material::{Color, Dielectric, Lambertian, Material, Metal, ScatterResult};
pub use output::{color_to_rgb8, linear_to_gamma, ImageBuffer, PixelSink, PpmWriter};
pub use renderer::{accumulate_samples, ray_color, render, render_pixel, RenderOptions, HIT_RANGE};
pub use sampling::{FixedSource, SampleSource, SeededSource};
pub use sphere::Sphere;

/// Re-export common math types from lumen_math
pub use lumen_math::{Interval, Ray, Vec2, Vec3};
