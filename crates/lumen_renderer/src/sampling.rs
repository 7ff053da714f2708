//! Random sample sources and sampling helpers.
//!
//! Every camera sample draws from its own random stream, keyed by the
//! pixel and the sample index. Workers never share generator state, and a
//! seeded source produces the same image whatever the thread count.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use lumen_math::{Vec2, Vec3};
use rand::rngs::mock::StepRng;
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};

/// A factory of independent random streams, one per camera sample.
pub trait SampleSource: Sync {
    /// Generator handed to a single sample.
    type Stream: RngCore;

    /// Random stream for sample `sample` of the pixel at linear index `pixel`.
    fn stream(&self, pixel: u64, sample: u32) -> Self::Stream;
}

/// Reproducible per-sample streams derived from a single seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeededSource {
    seed: u64,
}

impl SeededSource {
    /// Create a source from an explicit seed.
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create a source with a seed drawn from the thread-local generator.
    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }

    /// The seed this source was built from.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl SampleSource for SeededSource {
    type Stream = SmallRng;

    fn stream(&self, pixel: u64, sample: u32) -> SmallRng {
        let key = splitmix64(splitmix64(splitmix64(self.seed) ^ pixel) ^ u64::from(sample));
        SmallRng::seed_from_u64(key)
    }
}

/// A source whose streams repeat a fixed arithmetic sequence.
///
/// Useful for debugging and for tests that need exact ray directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSource {
    state: u64,
    increment: u64,
}

impl FixedSource {
    /// Every stream starts at `state` and advances by `increment` per draw.
    pub fn new(state: u64, increment: u64) -> Self {
        Self { state, increment }
    }

    /// A source whose every `f32` draw is exactly 0.5.
    ///
    /// Camera rays then pass through pixel centers and leave from the
    /// center of the defocus disk.
    pub fn pixel_center() -> Self {
        Self::new(1 << 31, 0)
    }
}

impl SampleSource for FixedSource {
    type Stream = StepRng;

    fn stream(&self, _pixel: u64, _sample: u32) -> StepRng {
        StepRng::new(self.state, self.increment)
    }
}

/// SplitMix64 finalizer, used to decorrelate neighbouring stream keys.
fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Uniform f32 in [0, 1).
#[inline]
pub(crate) fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    rng.gen()
}

/// Sample a random offset in the square [-0.5, 0.5] x [-0.5, 0.5].
pub(crate) fn sample_square(rng: &mut dyn RngCore) -> Vec2 {
    Vec2::new(gen_f32(rng) - 0.5, gen_f32(rng) - 0.5)
}

/// Sample a random point in the unit disk.
///
/// Uses the concentric square-to-disk mapping, so exactly two values are
/// drawn whatever the stream returns. A draw of (0.5, 0.5) maps to the center.
pub(crate) fn random_in_unit_disk(rng: &mut dyn RngCore) -> Vec2 {
    concentric_sample_disk(Vec2::new(gen_f32(rng), gen_f32(rng)))
}

/// Map a point of [0, 1]^2 onto the unit disk, preserving relative area.
fn concentric_sample_disk(u: Vec2) -> Vec2 {
    let offset = 2.0 * u - Vec2::ONE;

    if offset.x == 0.0 && offset.y == 0.0 {
        return Vec2::ZERO;
    }

    let (r, theta) = if offset.x.abs() > offset.y.abs() {
        (offset.x, FRAC_PI_4 * (offset.y / offset.x))
    } else {
        (offset.y, FRAC_PI_2 - FRAC_PI_4 * (offset.x / offset.y))
    };

    r * Vec2::new(theta.cos(), theta.sin())
}

/// Random unit vector, uniformly distributed on the unit sphere.
pub(crate) fn random_unit_vector(rng: &mut dyn RngCore) -> Vec3 {
    let theta = 2.0 * PI * gen_f32(rng);
    let cos_phi = 2.0 * gen_f32(rng) - 1.0;
    let sin_phi = (1.0 - cos_phi * cos_phi).max(0.0).sqrt();

    Vec3::new(sin_phi * theta.cos(), sin_phi * theta.sin(), cos_phi)
}
