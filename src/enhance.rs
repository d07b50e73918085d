//! Deterministic enhancement stage
//!
//! A pure transform over a decoded RGBA buffer: canonical high-quality
//! resize, per-channel contrast stretch, and a 4-neighbor discrete Laplacian
//! sharpen. The alpha channel is never touched by contrast or sharpening.

use crate::config::DenoiseLevel;
use image::imageops::{self, FilterType};
use image::RgbaImage;

/// Clamp an adjusted channel value back into u8 range
fn clamp_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Resize to `round(dimension × scale)` using Lanczos3 resampling
#[must_use]
pub fn resize(image: &RgbaImage, scale: f32) -> RgbaImage {
    if (scale - 1.0).abs() < f32::EPSILON {
        return image.clone();
    }
    let width = (image.width() as f32 * scale).round().max(1.0) as u32;
    let height = (image.height() as f32 * scale).round().max(1.0) as u32;
    imageops::resize(image, width, height, FilterType::Lanczos3)
}

/// Per-channel contrast stretch around the midpoint:
/// `clamp(0,255, (v - 128) × gain + 128)`
#[must_use]
pub fn adjust_contrast(image: &RgbaImage, gain: f32) -> RgbaImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        for channel in &mut pixel.0[..3] {
            *channel = clamp_channel((f32::from(*channel) - 128.0) * gain + 128.0);
        }
    }
    out
}

/// 4-neighbor discrete Laplacian sharpen:
/// `clamp(0,255, c + s × (4c − Σ neighbors))`
///
/// Interior pixels only; the 1-pixel border is copied unmodified.
#[must_use]
pub fn sharpen(image: &RgbaImage, strength: f32) -> RgbaImage {
    let (width, height) = image.dimensions();
    let mut out = image.clone();
    if width < 3 || height < 3 {
        return out;
    }

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let center = image.get_pixel(x, y);
            let up = image.get_pixel(x, y - 1);
            let down = image.get_pixel(x, y + 1);
            let left = image.get_pixel(x - 1, y);
            let right = image.get_pixel(x + 1, y);

            let mut sharpened = *center;
            for c in 0..3 {
                let center_v = f32::from(center.0[c]);
                let neighbor_sum = f32::from(up.0[c])
                    + f32::from(down.0[c])
                    + f32::from(left.0[c])
                    + f32::from(right.0[c]);
                let laplacian = 4.0 * center_v - neighbor_sum;
                sharpened.0[c] = clamp_channel(center_v + strength * laplacian);
            }
            out.put_pixel(x, y, sharpened);
        }
    }
    out
}

/// Run the full enhancement pass: resize, then contrast, then sharpen
///
/// [`DenoiseLevel::None`] skips contrast and sharpening entirely, leaving
/// the resized buffer byte-identical to the resize output.
#[must_use]
pub fn enhance(image: &RgbaImage, scale: f32, level: DenoiseLevel) -> RgbaImage {
    let resized = resize(image, scale);

    let Some(gain) = level.contrast_gain() else {
        return resized;
    };
    let contrasted = adjust_contrast(&resized, gain);

    match level.sharpen_strength() {
        Some(strength) => sharpen(&contrasted, strength),
        None => contrasted,
    }
}
