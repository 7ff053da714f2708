//! Output sinks for finished pixels.
//!
//! The renderer hands every finished, averaged pixel to a [`PixelSink`] in
//! scanline order. Sinks own gamma correction, clamping and formatting.

use std::io::{self, Write};
use std::path::Path;

use lumen_math::Interval;

use crate::Color;

/// Displayable intensity range before scaling to 8 bits.
const INTENSITY: Interval = Interval::new(0.0, 0.999);

/// Receiver of rendered pixels, one per call, in scanline-major order.
pub trait PixelSink {
    /// Called once before the first pixel.
    fn begin(&mut self, width: u32, height: u32) -> io::Result<()>;

    /// Receive the next pixel's linear color.
    fn write_pixel(&mut self, color: Color) -> io::Result<()>;

    /// Called once after the last pixel.
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Convert a linear color to gamma-corrected 8-bit RGB.
pub fn color_to_rgb8(color: Color) -> [u8; 3] {
    let to_byte = |c: f32| (256.0 * INTENSITY.clamp(linear_to_gamma(c))) as u8;
    [to_byte(color.x), to_byte(color.y), to_byte(color.z)]
}

/// Number of pixels in a `width` x `height` image, computed without `u32` overflow.
fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

/// In-memory image collecting linear colors.
#[derive(Debug, Clone, Default)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
    cursor: usize,
}

impl ImageBuffer {
    /// Create a new image buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; pixel_count(width, height)],
            cursor: 0,
        }
    }

    /// Get the pixel at (x, y).
    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    /// Number of pixels written since the last `begin`.
    pub fn written(&self) -> usize {
        self.cursor
    }

    /// Convert to gamma-corrected RGB bytes.
    pub fn to_rgb8(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|&color| color_to_rgb8(color)).collect()
    }

    /// Save as an 8-bit image; the format follows the file extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), image::ImageError> {
        image::save_buffer(
            path,
            &self.to_rgb8(),
            self.width,
            self.height,
            image::ColorType::Rgb8,
        )
    }
}

impl PixelSink for ImageBuffer {
    fn begin(&mut self, width: u32, height: u32) -> io::Result<()> {
        *self = ImageBuffer::new(width, height);
        Ok(())
    }

    fn write_pixel(&mut self, color: Color) -> io::Result<()> {
        let slot = self.pixels.get_mut(self.cursor).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "more pixels than the image holds")
        })?;
        *slot = color;
        self.cursor += 1;
        Ok(())
    }
}

/// Plain-text PPM (P3) writer.
pub struct PpmWriter<W: Write> {
    writer: W,
}

impl<W: Write> PpmWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> PixelSink for PpmWriter<W> {
    fn begin(&mut self, width: u32, height: u32) -> io::Result<()> {
        write!(self.writer, "P3\n{} {}\n255\n", width, height)
    }

    fn write_pixel(&mut self, color: Color) -> io::Result<()> {
        let [r, g, b] = color_to_rgb8(color);
        writeln!(self.writer, "{} {} {}", r, g, b)
    }

    fn finish(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
