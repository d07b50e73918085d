//! Vectorization collaborator adapter
//!
//! Maps a precision tier to a binarization threshold and drives a
//! bitmap-to-vector tracer over the grayscale-equivalent raster. The tracing
//! algorithm itself is a collaborator behind [`VectorTracer`]; the built-in
//! run tracer keeps the crate usable standalone.

use crate::config::VectorPrecision;
use crate::error::{PixeliftError, Result};
use image::{DynamicImage, GrayImage, RgbaImage};
use std::fmt::Write as _;

/// Trait for bitmap-to-vector tracers
pub trait VectorTracer: Send + Sync {
    /// Produce an SVG document from a grayscale raster
    ///
    /// Pixels darker than `threshold` count as ink; a lower threshold
    /// retains more detail.
    ///
    /// # Errors
    ///
    /// Returns an error when the input cannot be traced.
    fn trace(&self, image: &GrayImage, threshold: u8) -> Result<String>;
}

/// Built-in tracer that emits one filled path of horizontal ink runs
///
/// Deliberately simple: each row contributes rectangles covering its runs of
/// below-threshold pixels. Dedicated tracing engines can be injected for
/// smoother outlines.
pub struct RunTracer;

impl VectorTracer for RunTracer {
    fn trace(&self, image: &GrayImage, threshold: u8) -> Result<String> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(PixeliftError::stage("vectorize", "empty input raster"));
        }

        let mut path = String::new();
        for y in 0..height {
            let mut run_start: Option<u32> = None;
            for x in 0..width {
                let is_ink = image.get_pixel(x, y).0[0] < threshold;
                match (is_ink, run_start) {
                    (true, None) => run_start = Some(x),
                    (false, Some(start)) => {
                        let _ = write!(path, "M{start} {y}h{}v1h-{}z", x - start, x - start);
                        run_start = None;
                    },
                    _ => {},
                }
            }
            if let Some(start) = run_start {
                let _ = write!(path, "M{start} {y}h{}v1h-{}z", width - start, width - start);
            }
        }

        let mut svg = String::with_capacity(path.len() + 256);
        let _ = write!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 {width} {height}\" \
             width=\"{width}\" height=\"{height}\">"
        );
        let _ = write!(svg, "<path d=\"{path}\" fill=\"#000000\"/>");
        svg.push_str("</svg>");
        Ok(svg)
    }
}

/// Adapter binding a tracer to the precision tiers
pub struct Vectorizer {
    tracer: Box<dyn VectorTracer>,
}

impl Vectorizer {
    /// Create a vectorizer with the built-in run tracer
    #[must_use]
    pub fn new() -> Self {
        Self {
            tracer: Box::new(RunTracer),
        }
    }

    /// Create a vectorizer around an injected tracer
    #[must_use]
    pub fn with_tracer(tracer: Box<dyn VectorTracer>) -> Self {
        Self { tracer }
    }

    /// Trace an RGBA raster at the given precision tier
    ///
    /// # Errors
    ///
    /// Propagates tracer failures; callers treat these as "no vector output
    /// for this image" rather than aborting the pipeline.
    pub fn vectorize(&self, image: &RgbaImage, precision: VectorPrecision) -> Result<String> {
        let threshold = precision.threshold();
        log::debug!(
            "vectorizing {}x{} raster at threshold {threshold} ({precision:?})",
            image.width(),
            image.height()
        );
        let gray = DynamicImage::ImageRgba8(image.clone()).to_luma8();
        self.tracer.trace(&gray, threshold)
    }
}

impl Default for Vectorizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgba};

    #[test]
    fn test_trace_produces_svg_document() {
        let mut image = GrayImage::from_pixel(4, 4, Luma([255]));
        image.put_pixel(1, 1, Luma([0]));
        image.put_pixel(2, 1, Luma([0]));

        let svg = RunTracer.trace(&image, 128).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("viewBox=\"0 0 4 4\""));
        // The two dark pixels form one 2-wide run
        assert!(svg.contains("M1 1h2v1h-2z"));
    }

    #[test]
    fn test_threshold_controls_detail() {
        // Mid-gray pixel: ink at the low-precision threshold only
        let image = GrayImage::from_pixel(2, 1, Luma([160]));

        let coarse = RunTracer.trace(&image, VectorPrecision::Low.threshold()).unwrap();
        let fine = RunTracer.trace(&image, VectorPrecision::High.threshold()).unwrap();

        assert!(coarse.contains("h2v1h-2z"));
        assert!(!fine.contains("h2"));
    }

    #[test]
    fn test_run_extends_to_right_edge() {
        let image = GrayImage::from_pixel(3, 1, Luma([0]));
        let svg = RunTracer.trace(&image, 128).unwrap();
        assert!(svg.contains("M0 0h3v1h-3z"));
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let image = GrayImage::new(0, 0);
        let err = RunTracer.trace(&image, 128).unwrap_err();
        assert!(matches!(err, PixeliftError::Stage { .. }));
    }

    #[test]
    fn test_vectorizer_adapts_rgba_input() {
        let image = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        let svg = Vectorizer::new()
            .vectorize(&image, VectorPrecision::Medium)
            .unwrap();
        assert!(svg.contains("<path"));
    }
}
