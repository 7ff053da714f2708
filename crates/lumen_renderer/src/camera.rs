//! Camera for ray generation.
//!
//! A thin-lens camera: rays leave either the camera center or a point on
//! the defocus disk, and pass through a jittered point on the focus plane.

use crate::sampling::{random_in_unit_disk, sample_square};
use crate::{CameraConfig, CameraError, Hittable, PixelSink, Ray, RenderError};
use log::info;
use lumen_math::{Vec2, Vec3};
use rand::RngCore;

/// Camera for generating rays into the scene.
#[derive(Debug, Clone)]
pub struct Camera {
    config: CameraConfig,

    // Cached computed values (set by initialize())
    image_height: u32,
    center: Vec3,
    pixel00_loc: Vec3,
    pixel_delta_u: Vec3,
    pixel_delta_v: Vec3,
    viewport_upper_left: Vec3,
    u: Vec3,
    v: Vec3,
    w: Vec3,
    defocus_disk_u: Vec3,
    defocus_disk_v: Vec3,
    samples_scale: f32,
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self::from_config(CameraConfig::default())
    }

    /// Create a camera from a configuration. Call `initialize()` before use.
    pub fn from_config(config: CameraConfig) -> Self {
        Self {
            config,
            image_height: 1,
            center: Vec3::ZERO,
            pixel00_loc: Vec3::ZERO,
            pixel_delta_u: Vec3::ZERO,
            pixel_delta_v: Vec3::ZERO,
            viewport_upper_left: Vec3::ZERO,
            u: Vec3::X,
            v: Vec3::Y,
            w: Vec3::Z,
            defocus_disk_u: Vec3::ZERO,
            defocus_disk_v: Vec3::ZERO,
            samples_scale: 1.0,
        }
    }

    /// Set image width and aspect ratio (width over height).
    pub fn with_resolution(mut self, image_width: u32, aspect_ratio: f32) -> Self {
        self.config.image_width = image_width;
        self.config.aspect_ratio = aspect_ratio;
        self
    }

    /// Set quality settings.
    pub fn with_quality(mut self, samples_per_pixel: u32, max_depth: u32) -> Self {
        self.config.samples_per_pixel = samples_per_pixel;
        self.config.max_depth = max_depth;
        self
    }

    /// Set camera position.
    pub fn with_position(mut self, look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        self.config.look_from = look_from;
        self.config.look_at = look_at;
        self.config.vup = vup;
        self
    }

    /// Set lens settings.
    pub fn with_lens(mut self, vfov: f32, defocus_angle: f32, focus_dist: f32) -> Self {
        self.config.vfov = vfov;
        self.config.defocus_angle = defocus_angle;
        self.config.focus_dist = focus_dist;
        self
    }

    /// Initialize the camera (must be called before generating rays).
    ///
    /// Validates the configuration and derives the view basis, pixel grid
    /// and defocus disk. Calling it again with the same configuration
    /// produces the same state.
    pub fn initialize(&mut self) -> Result<(), CameraError> {
        self.config.validate()?;
        let config = &self.config;

        self.image_height = config.image_height();
        self.samples_scale = 1.0 / config.samples_per_pixel as f32;
        self.center = config.look_from;

        // Calculate viewport dimensions
        let theta = config.vfov.to_radians();
        let h = (theta / 2.0).tan();
        let viewport_height = 2.0 * h * config.focus_dist;
        let viewport_width = viewport_height * (config.image_width as f32 / self.image_height as f32);

        // Calculate camera basis vectors
        self.w = (config.look_from - config.look_at).normalize();
        self.u = config.vup.cross(self.w).normalize();
        self.v = self.w.cross(self.u);

        // Image rows grow downward while v points up
        let viewport_u = viewport_width * self.u;
        let viewport_v = -viewport_height * self.v;

        self.pixel_delta_u = viewport_u / config.image_width as f32;
        self.pixel_delta_v = viewport_v / self.image_height as f32;

        self.viewport_upper_left =
            self.center - config.focus_dist * self.w - viewport_u / 2.0 - viewport_v / 2.0;
        self.pixel00_loc = self.viewport_upper_left + 0.5 * (self.pixel_delta_u + self.pixel_delta_v);

        // Calculate defocus disk basis vectors
        let defocus_radius = config.focus_dist * (config.defocus_angle / 2.0).to_radians().tan();
        self.defocus_disk_u = self.u * defocus_radius;
        self.defocus_disk_v = self.v * defocus_radius;

        Ok(())
    }

    /// Generate a ray for pixel (i, j) with random sampling.
    ///
    /// Draws a sub-pixel jitter and, when defocus is enabled, a lens sample.
    pub fn get_ray(&self, i: u32, j: u32, rng: &mut dyn RngCore) -> Ray {
        let offset = sample_square(rng);
        let lens = if self.config.defocus_angle <= 0.0 {
            Vec2::ZERO
        } else {
            random_in_unit_disk(rng)
        };

        self.get_ray_with(i, j, offset, lens)
    }

    /// Generate the ray for pixel (i, j) from explicit sample values.
    ///
    /// `offset` is the jitter in pixel units, in [-0.5, 0.5]^2. `lens` is a
    /// point in the unit disk and is ignored when defocus is disabled.
    pub fn get_ray_with(&self, i: u32, j: u32, offset: Vec2, lens: Vec2) -> Ray {
        let pixel_sample = self.pixel00_loc
            + ((i as f32) + offset.x) * self.pixel_delta_u
            + ((j as f32) + offset.y) * self.pixel_delta_v;

        let ray_origin = if self.config.defocus_angle <= 0.0 {
            self.center
        } else {
            self.center + lens.x * self.defocus_disk_u + lens.y * self.defocus_disk_v
        };

        Ray::new(ray_origin, pixel_sample - ray_origin)
    }

    /// Render `world` with default options and a randomly seeded source.
    ///
    /// Returns the seed; `SeededSource::new(seed)` reproduces the image.
    pub fn render(&mut self, world: &dyn Hittable, sink: &mut dyn PixelSink) -> Result<u64, RenderError> {
        let source = crate::SeededSource::from_entropy();
        info!("Sample seed: {}", source.seed());
        crate::render(self, world, &source, &crate::RenderOptions::default(), sink)?;
        Ok(source.seed())
    }

    /// The configuration this camera renders with.
    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn image_width(&self) -> u32 {
        self.config.image_width
    }

    pub fn image_height(&self) -> u32 {
        self.image_height
    }

    pub fn samples_per_pixel(&self) -> u32 {
        self.config.samples_per_pixel
    }

    pub fn max_depth(&self) -> u32 {
        self.config.max_depth
    }

    /// Get the samples scale factor (1 / samples_per_pixel).
    pub fn samples_scale(&self) -> f32 {
        self.samples_scale
    }

    /// Camera center (the look-from point).
    pub fn center(&self) -> Vec3 {
        self.center
    }

    /// Orthonormal camera frame (right, up, backward).
    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        (self.u, self.v, self.w)
    }

    /// Upper-left corner of the viewport on the focus plane.
    pub fn viewport_upper_left(&self) -> Vec3 {
        self.viewport_upper_left
    }

    /// Center of pixel (0, 0) on the focus plane.
    pub fn pixel00_loc(&self) -> Vec3 {
        self.pixel00_loc
    }

    /// World-space step to the next pixel right and the next pixel down.
    pub fn pixel_deltas(&self) -> (Vec3, Vec3) {
        (self.pixel_delta_u, self.pixel_delta_v)
    }

    /// Defocus disk radius vectors along u and v.
    pub fn defocus_disk(&self) -> (Vec3, Vec3) {
        (self.defocus_disk_u, self.defocus_disk_v)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}
