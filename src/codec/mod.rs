//! Resolution metadata codec
//!
//! Pure byte-level transforms that embed a physical pixel density (DPI) into
//! PNG and JPEG containers, and read an existing density back out of PNG.
//! Resolution intent survives downstream re-encoding without recomputing
//! pixel dimensions; pixel dimensions are controlled solely by the upscale
//! factor, never by DPI.

mod crc;
mod jpeg;
mod png;

pub use crc::crc32;
pub use jpeg::write_jpeg_dpi;
pub use png::{read_png_dpi, write_png_dpi};

/// Inches per meter, used for the PNG pixels-per-meter conversion
const INCHES_PER_METER: f64 = 39.3701;

/// Convert dots-per-inch to the pixels-per-meter value stored in pHYs
#[must_use]
pub fn dpi_to_pixels_per_meter(dpi: u32) -> u32 {
    (f64::from(dpi) * INCHES_PER_METER).round() as u32
}

/// Convert a pHYs pixels-per-meter value back to dots-per-inch
#[must_use]
pub fn pixels_per_meter_to_dpi(pixels_per_meter: u32) -> u32 {
    (f64::from(pixels_per_meter) / INCHES_PER_METER).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dpi_conversion_presets() {
        assert_eq!(dpi_to_pixels_per_meter(72), 2835);
        assert_eq!(dpi_to_pixels_per_meter(150), 5906);
        assert_eq!(dpi_to_pixels_per_meter(300), 11811);
        assert_eq!(dpi_to_pixels_per_meter(600), 23622);
    }

    #[test]
    fn test_dpi_conversion_roundtrip() {
        for dpi in [72u32, 96, 150, 300, 600] {
            assert_eq!(pixels_per_meter_to_dpi(dpi_to_pixels_per_meter(dpi)), dpi);
        }
    }
}
