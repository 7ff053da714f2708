use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use lumen_math::Vec3;
use lumen_renderer::CameraConfig;

/// Custom enum for log levels that can be used with clap's ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Built-in scenes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SceneKind {
    /// No geometry, only the sky
    Empty,
    /// Ground, diffuse, glass, hollow glass and metal spheres
    Materials,
    /// Field of small random spheres around three large ones
    Cover,
}

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "lumen")]
#[command(about = "A Monte Carlo path tracer")]
pub struct Args {
    /// Scene to render
    #[arg(long, value_enum, default_value = "materials")]
    pub scene: SceneKind,

    /// JSON camera configuration; replaces the scene's default camera
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output file (.ppm or .png), or "-" for PPM on stdout
    #[arg(short, long, default_value = "image.ppm")]
    pub output: String,

    /// Image width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Image width over height
    #[arg(long)]
    pub aspect_ratio: Option<f32>,

    /// Number of samples per pixel
    #[arg(long, short = 's')]
    pub samples_per_pixel: Option<u32>,

    /// Maximum number of ray bounces
    #[arg(long)]
    pub max_depth: Option<u32>,

    /// Vertical field of view in degrees
    #[arg(long)]
    pub vfov: Option<f32>,

    /// Camera position as x,y,z
    #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
    pub look_from: Option<Vec3>,

    /// Point the camera looks at as x,y,z
    #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
    pub look_at: Option<Vec3>,

    /// Camera up direction as x,y,z
    #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
    pub vup: Option<Vec3>,

    /// Defocus angle in degrees (0 disables depth of field)
    #[arg(long)]
    pub defocus_angle: Option<f32>,

    /// Distance to the plane of perfect focus
    #[arg(long)]
    pub focus_dist: Option<f32>,

    /// Worker threads for sampling (defaults to one per core)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Seed for sampling and scene layout; random when omitted
    #[arg(long)]
    pub seed: Option<u64>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Set the logging level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}

impl Args {
    /// Apply per-field command line overrides on top of `config`.
    pub fn apply_overrides(&self, config: &mut CameraConfig) {
        if let Some(width) = self.width {
            config.image_width = width;
        }
        if let Some(aspect_ratio) = self.aspect_ratio {
            config.aspect_ratio = aspect_ratio;
        }
        if let Some(samples) = self.samples_per_pixel {
            config.samples_per_pixel = samples;
        }
        if let Some(max_depth) = self.max_depth {
            config.max_depth = max_depth;
        }
        if let Some(vfov) = self.vfov {
            config.vfov = vfov;
        }
        if let Some(look_from) = self.look_from {
            config.look_from = look_from;
        }
        if let Some(look_at) = self.look_at {
            config.look_at = look_at;
        }
        if let Some(vup) = self.vup {
            config.vup = vup;
        }
        if let Some(defocus_angle) = self.defocus_angle {
            config.defocus_angle = defocus_angle;
        }
        if let Some(focus_dist) = self.focus_dist {
            config.focus_dist = focus_dist;
        }
    }
}

/// Parse "x,y,z" into a vector.
fn parse_vec3(text: &str) -> Result<Vec3, String> {
    let parts = text
        .split(',')
        .map(|part| part.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid number in '{text}': {e}"))?;

    match parts.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(format!("expected three comma-separated numbers, got '{text}'")),
    }
}
