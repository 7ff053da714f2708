//! Command line front end for the Lumen path tracer.

mod cli;
mod scenes;

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use lumen_renderer::{
    render, Camera, CameraConfig, HittableList, ImageBuffer, PpmWriter, RenderOptions, SeededSource,
};

use cli::Args;

/// Seed for scene layout when none is given, so scenes look the same run to run.
const DEFAULT_SCENE_SEED: u64 = 42;

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(args.log_level.into())
        .init();

    let (world, scene_camera) = scenes::build(args.scene, args.seed.unwrap_or(DEFAULT_SCENE_SEED));
    info!("Built {:?} scene with {} objects", args.scene, world.len());

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => scene_camera,
    };
    args.apply_overrides(&mut config);

    let source = match args.seed {
        Some(seed) => SeededSource::new(seed),
        None => SeededSource::from_entropy(),
    };
    info!("Sample seed: {}", source.seed());

    let options = RenderOptions {
        threads: args.threads,
        progress: !args.no_progress,
    };

    let mut camera = Camera::from_config(config);
    write_image(&args.output, &mut camera, &world, &source, &options)
}

fn load_config(path: &Path) -> Result<CameraConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read camera config {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse camera config {}", path.display()))
}

fn write_image(
    output: &str,
    camera: &mut Camera,
    world: &HittableList,
    source: &SeededSource,
    options: &RenderOptions,
) -> Result<()> {
    if output == "-" {
        let mut sink = PpmWriter::new(BufWriter::new(io::stdout().lock()));
        render(camera, world, source, options, &mut sink).context("render failed")?;
        return Ok(());
    }

    let path = Path::new(output);
    let is_ppm = path
        .extension()
        .map_or(true, |ext| ext.eq_ignore_ascii_case("ppm"));

    if is_ppm {
        let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        let mut sink = PpmWriter::new(BufWriter::new(file));
        render(camera, world, source, options, &mut sink).context("render failed")?;
    } else {
        let mut image = ImageBuffer::default();
        render(camera, world, source, options, &mut image).context("render failed")?;
        image
            .save(path)
            .with_context(|| format!("failed to save {}", path.display()))?;
    }

    info!("Saved to {}", path.display());
    Ok(())
}
