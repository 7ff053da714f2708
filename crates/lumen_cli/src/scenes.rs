//! Built-in scenes and their default cameras.

use lumen_math::Vec3;
use lumen_renderer::{CameraConfig, Color, Dielectric, HittableList, Lambertian, Metal, Sphere};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::cli::SceneKind;

/// Build the scene geometry and the camera it is meant to be seen from.
pub fn build(kind: SceneKind, seed: u64) -> (HittableList, CameraConfig) {
    match kind {
        SceneKind::Empty => (HittableList::new(), CameraConfig::default()),
        SceneKind::Materials => materials(),
        SceneKind::Cover => cover(seed),
    }
}

fn materials() -> (HittableList, CameraConfig) {
    let mut world = HittableList::new();

    world.add(Box::new(Sphere::new(
        Vec3::new(0.0, -100.5, -1.0),
        100.0,
        Lambertian::new(Color::new(0.8, 0.8, 0.0)),
    )));
    world.add(Box::new(Sphere::new(
        Vec3::new(0.0, 0.0, -1.2),
        0.5,
        Lambertian::new(Color::new(0.1, 0.2, 0.5)),
    )));
    world.add(Box::new(Sphere::new(Vec3::new(-1.0, 0.0, -1.0), 0.5, Dielectric::new(1.5))));
    // Air bubble inside the glass sphere
    world.add(Box::new(Sphere::new(Vec3::new(-1.0, 0.0, -1.0), 0.4, Dielectric::new(1.0 / 1.5))));
    world.add(Box::new(Sphere::new(
        Vec3::new(1.0, 0.0, -1.0),
        0.5,
        Metal::new(Color::new(0.8, 0.6, 0.2), 1.0),
    )));

    let camera = CameraConfig {
        aspect_ratio: 16.0 / 9.0,
        image_width: 400,
        samples_per_pixel: 100,
        max_depth: 50,
        vfov: 20.0,
        look_from: Vec3::new(-2.0, 2.0, 1.0),
        look_at: Vec3::new(0.0, 0.0, -1.0),
        vup: Vec3::Y,
        defocus_angle: 10.0,
        focus_dist: 3.4,
    };

    (world, camera)
}

fn cover(seed: u64) -> (HittableList, CameraConfig) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut world = HittableList::new();

    // Ground
    world.add(Box::new(Sphere::new(
        Vec3::new(0.0, -1000.0, 0.0),
        1000.0,
        Lambertian::new(Color::new(0.5, 0.5, 0.5)),
    )));

    for a in -11..11 {
        for b in -11..11 {
            let center = Vec3::new(
                a as f32 + 0.9 * rng.gen::<f32>(),
                0.2,
                b as f32 + 0.9 * rng.gen::<f32>(),
            );

            if (center - Vec3::new(4.0, 0.2, 0.0)).length() <= 0.9 {
                continue;
            }

            let choose_mat: f32 = rng.gen();
            if choose_mat < 0.8 {
                let albedo = Color::new(
                    rng.gen::<f32>() * rng.gen::<f32>(),
                    rng.gen::<f32>() * rng.gen::<f32>(),
                    rng.gen::<f32>() * rng.gen::<f32>(),
                );
                world.add(Box::new(Sphere::new(center, 0.2, Lambertian::new(albedo))));
            } else if choose_mat < 0.95 {
                let albedo = Color::new(
                    rng.gen_range(0.5..1.0),
                    rng.gen_range(0.5..1.0),
                    rng.gen_range(0.5..1.0),
                );
                let fuzz = rng.gen_range(0.0..0.5);
                world.add(Box::new(Sphere::new(center, 0.2, Metal::new(albedo, fuzz))));
            } else {
                world.add(Box::new(Sphere::new(center, 0.2, Dielectric::new(1.5))));
            }
        }
    }

    world.add(Box::new(Sphere::new(Vec3::new(0.0, 1.0, 0.0), 1.0, Dielectric::new(1.5))));
    world.add(Box::new(Sphere::new(
        Vec3::new(-4.0, 1.0, 0.0),
        1.0,
        Lambertian::new(Color::new(0.4, 0.2, 0.1)),
    )));
    world.add(Box::new(Sphere::new(
        Vec3::new(4.0, 1.0, 0.0),
        1.0,
        Metal::new(Color::new(0.7, 0.6, 0.5), 0.0),
    )));

    let camera = CameraConfig {
        aspect_ratio: 16.0 / 9.0,
        image_width: 400,
        samples_per_pixel: 50,
        max_depth: 50,
        vfov: 20.0,
        look_from: Vec3::new(13.0, 2.0, 3.0),
        look_at: Vec3::ZERO,
        vup: Vec3::Y,
        defocus_angle: 0.6,
        focus_dist: 10.0,
    };

    (world, camera)
}
