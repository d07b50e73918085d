//! Software upscale backend
//!
//! Pure-Rust resampling path used when no accelerated backend is available
//! or after degradation. Deterministic and dependency-free, at the cost of
//! detail reconstruction quality compared to a learned model.

use crate::config::UpscaleFactor;
use crate::error::{PixeliftError, Result};
use crate::inference::{BackendKind, UpscaleBackend};
use image::imageops::{self, FilterType};
use image::RgbaImage;
use instant::{Duration, Instant};

/// Software backend based on Lanczos3 resampling
#[derive(Debug, Default)]
pub struct SoftwareBackend {
    loaded_scale: Option<UpscaleFactor>,
}

impl SoftwareBackend {
    /// Create a new uninitialized software backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl UpscaleBackend for SoftwareBackend {
    fn initialize(&mut self, scale: UpscaleFactor) -> Result<Option<Duration>> {
        let start = Instant::now();
        // No weights to load; initialization just records the scale
        self.loaded_scale = Some(scale);
        log::info!("software backend ready for {scale} upscaling");
        Ok(Some(start.elapsed()))
    }

    fn upscale(
        &mut self,
        input: &RgbaImage,
        on_progress: &mut dyn FnMut(f32),
    ) -> Result<RgbaImage> {
        let scale = self
            .loaded_scale
            .ok_or_else(|| PixeliftError::backend("software backend not initialized"))?;

        on_progress(0.0);
        let multiplier = scale.multiplier();
        let output = imageops::resize(
            input,
            input.width() * multiplier,
            input.height() * multiplier,
            FilterType::Lanczos3,
        );
        on_progress(1.0);
        Ok(output)
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Software
    }

    fn loaded_scale(&self) -> Option<UpscaleFactor> {
        self.loaded_scale
    }

    fn is_initialized(&self) -> bool {
        self.loaded_scale.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_upscale_requires_initialization() {
        let mut backend = SoftwareBackend::new();
        let input = RgbaImage::new(4, 4);
        let err = backend.upscale(&input, &mut |_| {}).unwrap_err();
        assert!(matches!(err, PixeliftError::Backend(_)));
    }

    #[test]
    fn test_upscale_scales_dimensions() {
        let mut backend = SoftwareBackend::new();
        backend.initialize(UpscaleFactor::X3).unwrap();
        assert!(backend.is_initialized());

        let input = RgbaImage::from_pixel(5, 4, Rgba([10, 20, 30, 255]));
        let mut fractions = Vec::new();
        let output = backend
            .upscale(&input, &mut |f| fractions.push(f))
            .unwrap();

        assert_eq!(output.dimensions(), (15, 12));
        assert_eq!(fractions.first(), Some(&0.0));
        assert_eq!(fractions.last(), Some(&1.0));
    }

    #[test]
    fn test_reinitialize_switches_scale() {
        let mut backend = SoftwareBackend::new();
        backend.initialize(UpscaleFactor::X2).unwrap();
        assert_eq!(backend.loaded_scale(), Some(UpscaleFactor::X2));
        backend.initialize(UpscaleFactor::X4).unwrap();
        assert_eq!(backend.loaded_scale(), Some(UpscaleFactor::X4));
    }
}
