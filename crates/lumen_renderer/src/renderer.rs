//! Core path tracing renderer.
//!
//! Implements Monte Carlo path tracing with:
//! - Recursive ray tracing with a bounded bounce budget
//! - Anti-aliasing and depth of field via multi-sampling
//! - Per-pixel parallel sample reduction on a fixed-size rayon pool

use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use rand::RngCore;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::{Camera, Color, Hittable, PixelSink, Ray, RenderError, SampleSource};
use lumen_math::Interval;

/// Distances accepted when tracing; the near bound avoids self-intersection.
pub const HIT_RANGE: Interval = Interval::new(0.001, f32::INFINITY);

/// Execution settings. They never change the rendered image.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Worker threads for the sample pool (`None` lets rayon decide)
    pub threads: Option<usize>,
    /// Show a scanline progress bar on stderr
    pub progress: bool,
}

/// Compute the color seen by a ray.
///
/// Traces the ray through the scene, bouncing off surfaces and multiplying
/// in each surface's attenuation. Paths that run out of bounces carry no
/// light.
pub fn ray_color(ray: &Ray, world: &dyn Hittable, depth: u32, rng: &mut dyn RngCore) -> Color {
    if depth == 0 {
        return Color::ZERO;
    }

    let Some(rec) = world.hit(ray, HIT_RANGE) else {
        return sky_gradient(ray);
    };

    match rec.material.scatter(ray, &rec, rng) {
        Some(result) => result.attenuation * ray_color(&result.scattered, world, depth - 1, rng),
        None => Color::ZERO,
    }
}

/// Background: white at the horizon below, sky blue overhead.
fn sky_gradient(ray: &Ray) -> Color {
    let unit_direction = ray.direction().normalize();
    let a = 0.5 * (unit_direction.y + 1.0);
    let white = Color::new(1.0, 1.0, 1.0);
    let blue = Color::new(0.5, 0.7, 1.0);
    white * (1.0 - a) + blue * a
}

/// Sum all samples of pixel (i, j) in parallel on the current rayon pool.
///
/// Each sample draws from its own stream, so the set of samples is fixed
/// and only the order of the additions depends on scheduling.
pub fn accumulate_samples<S: SampleSource>(
    camera: &Camera,
    world: &dyn Hittable,
    i: u32,
    j: u32,
    source: &S,
) -> Color {
    let pixel = u64::from(j) * u64::from(camera.image_width()) + u64::from(i);

    (0..camera.samples_per_pixel())
        .into_par_iter()
        .map(|sample| {
            let mut rng = source.stream(pixel, sample);
            let ray = camera.get_ray(i, j, &mut rng);
            ray_color(&ray, world, camera.max_depth(), &mut rng)
        })
        .reduce(|| Color::ZERO, |a, b| a + b)
}

/// Render a single pixel: the averaged color of all its samples.
pub fn render_pixel<S: SampleSource>(
    camera: &Camera,
    world: &dyn Hittable,
    i: u32,
    j: u32,
    source: &S,
) -> Color {
    accumulate_samples(camera, world, i, j, source) * camera.samples_scale()
}

/// Render the entire scene into `sink`.
///
/// Pixels are emitted top-to-bottom, left-to-right; each one is complete
/// before the next pixel's samples start.
pub fn render<S: SampleSource>(
    camera: &mut Camera,
    world: &dyn Hittable,
    source: &S,
    options: &RenderOptions,
    sink: &mut dyn PixelSink,
) -> Result<(), RenderError> {
    camera.initialize()?;
    let camera: &Camera = camera;
    let pool = build_pool(options.threads)?;

    let (width, height) = (camera.image_width(), camera.image_height());
    info!(
        "Rendering {}x{} @ {} spp, max depth {}, {} threads",
        width,
        height,
        camera.samples_per_pixel(),
        camera.max_depth(),
        pool.current_num_threads()
    );

    let progress = if options.progress {
        let bar = ProgressBar::new(u64::from(height));
        bar.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} scanlines ETA: {eta}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar
    } else {
        ProgressBar::hidden()
    };

    let start = Instant::now();
    sink.begin(width, height)?;

    for j in 0..height {
        debug!("Scanlines remaining: {}", height - j);
        for i in 0..width {
            let color = pool.install(|| render_pixel(camera, world, i, j, source));
            sink.write_pixel(color)?;
        }
        progress.inc(1);
    }

    sink.finish()?;
    progress.finish_and_clear();
    info!("Done in {:?}", start.elapsed());

    Ok(())
}

fn build_pool(threads: Option<usize>) -> Result<ThreadPool, RenderError> {
    let mut builder = ThreadPoolBuilder::new().thread_name(|index| format!("lumen-sample-{index}"));
    if let Some(threads) = threads {
        builder = builder.num_threads(threads);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        FixedSource, HitRecord, HittableList, ImageBuffer, Lambertian, Material, ScatterResult,
        SeededSource, Sphere, Vec2, Vec3,
    };
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io;

    const EPS: f32 = 1e-5;

    /// Pass-through material that dims light without bending it.
    struct Tint(Color);

    impl Material for Tint {
        fn scatter(&self, ray_in: &Ray, rec: &HitRecord, _rng: &mut dyn RngCore) -> Option<ScatterResult> {
            Some(ScatterResult {
                attenuation: self.0,
                scattered: Ray::new(rec.p, ray_in.direction()),
            })
        }
    }

    /// Material that absorbs everything.
    struct Absorber;

    impl Material for Absorber {
        fn scatter(&self, _ray_in: &Ray, _rec: &HitRecord, _rng: &mut dyn RngCore) -> Option<ScatterResult> {
            None
        }
    }

    /// Infinite plane x = `x`, facing -X.
    struct Pane<M: Material> {
        x: f32,
        material: M,
    }

    impl<M: Material> Hittable for Pane<M> {
        fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord<'_>> {
            if ray.direction().x == 0.0 {
                return None;
            }
            let t = (self.x - ray.origin().x) / ray.direction().x;
            ray_t
                .surrounds(t)
                .then(|| HitRecord::new(ray, t, Vec3::NEG_X, &self.material))
        }
    }

    fn pane_stack(count: usize, attenuation: Color) -> HittableList {
        let mut world = HittableList::new();
        for k in 1..=count {
            world.add(Box::new(Pane {
                x: k as f32,
                material: Tint(attenuation),
            }));
        }
        world
    }

    fn sky_camera(width: u32, aspect_ratio: f32, samples: u32) -> Camera {
        Camera::new()
            .with_resolution(width, aspect_ratio)
            .with_quality(samples, 10)
            .with_position(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::Y)
            .with_lens(90.0, 0.0, 10.0)
    }

    /// Sink that refuses every pixel after the first `limit`.
    struct FailingSink {
        limit: usize,
        accepted: usize,
        finished: bool,
    }

    impl PixelSink for FailingSink {
        fn begin(&mut self, _width: u32, _height: u32) -> io::Result<()> {
            Ok(())
        }

        fn write_pixel(&mut self, _color: Color) -> io::Result<()> {
            if self.accepted == self.limit {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"));
            }
            self.accepted += 1;
            Ok(())
        }

        fn finish(&mut self) -> io::Result<()> {
            self.finished = true;
            Ok(())
        }
    }

    fn render_to_buffer<S: SampleSource>(camera: &mut Camera, world: &dyn Hittable, source: &S) -> ImageBuffer {
        let mut image = ImageBuffer::default();
        render(camera, world, source, &RenderOptions::default(), &mut image).unwrap();
        image
    }

    #[test]
    fn test_sky_gradient() {
        let up = sky_gradient(&Ray::new(Vec3::ZERO, Vec3::new(0.0, 3.0, 0.0)));
        let down = sky_gradient(&Ray::new(Vec3::ZERO, Vec3::new(0.0, -1.0, 0.0)));
        let level = sky_gradient(&Ray::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0)));

        assert!(up.abs_diff_eq(Color::new(0.5, 0.7, 1.0), EPS));
        assert!(down.abs_diff_eq(Color::ONE, EPS));
        assert!(level.abs_diff_eq(Color::new(0.75, 0.85, 1.0), EPS));
    }

    #[test]
    fn test_ray_color_zero_depth_is_black() {
        let world = HittableList::new();
        let mut rng = StdRng::seed_from_u64(1);
        let ray = Ray::new(Vec3::ZERO, Vec3::Y);

        assert_eq!(ray_color(&ray, &world, 0, &mut rng), Color::ZERO);
        assert!(ray_color(&ray, &world, 1, &mut rng).abs_diff_eq(Color::new(0.5, 0.7, 1.0), EPS));
    }

    #[test]
    fn test_ray_color_absorbed_is_black() {
        let mut world = HittableList::new();
        world.add(Box::new(Pane { x: 1.0, material: Absorber }));
        let mut rng = StdRng::seed_from_u64(1);

        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert_eq!(ray_color(&ray, &world, 5, &mut rng), Color::ZERO);
    }

    #[test]
    fn test_energy_decays_with_bounces() {
        let attenuation = Color::new(0.9, 0.5, 0.25);
        let ray = Ray::new(Vec3::new(0.5, 0.0, 0.0), Vec3::X);
        let background = sky_gradient(&ray);
        let mut rng = StdRng::seed_from_u64(1);

        let mut previous = background;
        for panes in 1..6 {
            let world = pane_stack(panes, attenuation);
            let color = ray_color(&ray, &world, 50, &mut rng);

            let expected = background * attenuation.powf(panes as f32);
            assert!(color.abs_diff_eq(expected, EPS), "{panes} panes: {color} vs {expected}");
            assert!(color.cmple(previous).all());
            assert!(color.length() < previous.length());
            previous = color;

            // A budget that cannot get past every pane yields no light
            assert_eq!(ray_color(&ray, &world, panes as u32, &mut rng), Color::ZERO);
        }
    }

    #[test]
    fn test_empty_scene_matches_sky_at_pixel_centers() {
        let mut camera = sky_camera(8, 2.0, 1);
        let world = HittableList::new();
        let image = render_to_buffer(&mut camera, &world, &FixedSource::pixel_center());

        assert_eq!((image.width, image.height), (8, 4));
        assert_eq!(image.written(), 32);
        for (i, j) in [(0, 0), (3, 1), (7, 3), (5, 2)] {
            let ray = camera.get_ray_with(i, j, Vec2::ZERO, Vec2::ZERO);
            assert!(image.get(i, j).abs_diff_eq(sky_gradient(&ray), EPS));
        }
    }

    #[test]
    fn test_two_by_two_closed_form() {
        let mut camera = sky_camera(2, 1.0, 1);
        let world = HittableList::new();
        let image = render_to_buffer(&mut camera, &world, &FixedSource::pixel_center());

        // Pixel centers sit at (+-5, +-5, -10); |y| / |d| = 1 / sqrt(6)
        let a_top = 0.5 * (1.0 + 1.0 / 6.0_f32.sqrt());
        let a_bottom = 0.5 * (1.0 - 1.0 / 6.0_f32.sqrt());
        let top = Color::new(1.0 - 0.5 * a_top, 1.0 - 0.3 * a_top, 1.0);
        let bottom = Color::new(1.0 - 0.5 * a_bottom, 1.0 - 0.3 * a_bottom, 1.0);

        let expected = [top, top, bottom, bottom];
        assert_eq!(image.pixels.len(), 4);
        for (pixel, expected) in image.pixels.iter().zip(expected) {
            assert!(pixel.abs_diff_eq(expected, EPS), "{pixel} vs {expected}");
        }
        assert!(top.abs_diff_eq(Color::new(0.647938, 0.788763, 1.0), 1e-5));
    }

    #[test]
    fn test_zero_depth_renders_black() {
        let mut world = HittableList::new();
        world.add(Box::new(Sphere::new(
            Vec3::new(0.0, 0.0, -1.0),
            0.5,
            Lambertian::new(Color::splat(0.5)),
        )));
        let mut camera = sky_camera(6, 1.5, 4).with_quality(4, 0);
        let image = render_to_buffer(&mut camera, &world, &SeededSource::new(3));

        assert_eq!(image.written(), 24);
        assert!(image.pixels.iter().all(|&c| c == Color::ZERO));
    }

    #[test]
    fn test_reduction_is_independent_of_thread_count() {
        let mut world = HittableList::new();
        world.add(Box::new(Sphere::new(
            Vec3::new(0.0, 0.0, -1.0),
            0.5,
            Lambertian::new(Color::new(0.7, 0.3, 0.3)),
        )));
        world.add(Box::new(Sphere::new(
            Vec3::new(0.0, -100.5, -1.0),
            100.0,
            Lambertian::new(Color::new(0.8, 0.8, 0.0)),
        )));
        let mut camera = Camera::new()
            .with_resolution(16, 1.0)
            .with_quality(64, 8)
            .with_lens(90.0, 2.0, 1.0);
        camera.initialize().unwrap();
        let source = SeededSource::new(0xC0FFEE);

        let single = build_pool(Some(1)).unwrap();
        let many = build_pool(Some(4)).unwrap();

        for (i, j) in [(8, 8), (0, 15), (12, 3)] {
            let a = single.install(|| accumulate_samples(&camera, &world, i, j, &source));
            let b = many.install(|| accumulate_samples(&camera, &world, i, j, &source));
            assert!(a.abs_diff_eq(b, 1e-3), "pixel ({i}, {j}): {a} vs {b}");
            assert!(a.length() > 0.0);
        }
    }

    #[test]
    fn test_every_sample_is_counted() {
        let mut camera = sky_camera(4, 1.0, 97);
        camera.initialize().unwrap();
        let world = HittableList::new();
        let source = FixedSource::pixel_center();
        let pool = build_pool(Some(8)).unwrap();

        let ray = camera.get_ray_with(1, 2, Vec2::ZERO, Vec2::ZERO);
        let sum = pool.install(|| accumulate_samples(&camera, &world, 1, 2, &source));

        assert!(sum.abs_diff_eq(sky_gradient(&ray) * 97.0, 1e-3));
        let average = render_pixel(&camera, &world, 1, 2, &source);
        assert!(average.abs_diff_eq(sky_gradient(&ray), 1e-5));
    }

    #[test]
    fn test_seeded_render_is_reproducible() {
        let mut world = HittableList::new();
        world.add(Box::new(Sphere::new(
            Vec3::new(0.0, 0.0, -1.0),
            0.5,
            Lambertian::new(Color::splat(0.5)),
        )));
        let source = SeededSource::new(11);

        let mut first = sky_camera(5, 1.0, 8).with_lens(90.0, 0.0, 1.0);
        let mut second = first.clone();
        let a = render_to_buffer(&mut first, &world, &source);

        let mut b = ImageBuffer::default();
        let options = RenderOptions { threads: Some(3), progress: false };
        render(&mut second, &world, &source, &options, &mut b).unwrap();

        for (x, y) in a.pixels.iter().zip(&b.pixels) {
            assert!(x.abs_diff_eq(*y, 1e-5));
        }
    }

    #[test]
    fn test_failing_sink_stops_the_render() {
        let mut camera = sky_camera(4, 2.0, 2);
        let mut sink = FailingSink {
            limit: 5,
            accepted: 0,
            finished: false,
        };

        let result = render(
            &mut camera,
            &HittableList::new(),
            &SeededSource::new(1),
            &RenderOptions::default(),
            &mut sink,
        );

        match result {
            Err(RenderError::Output(err)) => assert_eq!(err.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("expected an output error, got {:?}", other),
        }
        assert_eq!(sink.accepted, 5);
        assert!(!sink.finished);
    }

    #[test]
    fn test_defocus_render_with_constant_corner_stream() {
        // Every draw is 0.0, so the lens sample sits on the disk's rim
        let mut camera = sky_camera(3, 1.0, 2).with_lens(90.0, 2.0, 1.0);
        let image = render_to_buffer(&mut camera, &HittableList::new(), &FixedSource::new(0, 0));

        assert_eq!(image.written(), 9);
        assert!(image.pixels.iter().all(|c| c.is_finite() && c.z > 0.99));
    }

    #[test]
    fn test_render_rejects_invalid_camera() {
        let mut camera = sky_camera(4, 1.0, 1).with_quality(0, 5);
        let mut image = ImageBuffer::default();
        let result = render(
            &mut camera,
            &HittableList::new(),
            &FixedSource::pixel_center(),
            &RenderOptions::default(),
            &mut image,
        );

        assert!(matches!(result, Err(RenderError::Camera(crate::CameraError::ZeroSamples))));
        assert_eq!(image.written(), 0);
    }
}
