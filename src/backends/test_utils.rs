//! Mock backends for testing the upscale engine and pipeline
//!
//! These mocks avoid any real inference work while exercising the
//! initialization, degradation, and failure paths.

use crate::config::UpscaleFactor;
use crate::error::{PixeliftError, Result};
use crate::inference::{BackendFactory, BackendKind, UpscaleBackend};
use image::imageops::{self, FilterType};
use image::RgbaImage;
use instant::Duration;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Mock accelerated backend with scriptable failure behavior
pub struct MockAcceleratedBackend {
    loaded_scale: Option<UpscaleFactor>,
    /// Number of `upscale` calls that fail with a backend-class error before
    /// the mock starts succeeding
    failures_remaining: usize,
    /// Number of `initialize` calls that fail with a backend-class error
    /// before the mock starts succeeding
    init_failures_remaining: usize,
    /// Counts initialize calls, shared so tests can observe reloads
    pub init_calls: Arc<AtomicUsize>,
}

impl MockAcceleratedBackend {
    /// Create a mock that always succeeds
    #[must_use]
    pub fn new() -> Self {
        Self::failing_times(0)
    }

    /// Create a mock whose first `count` upscale calls fail with a
    /// backend-class error
    #[must_use]
    pub fn failing_times(count: usize) -> Self {
        Self {
            loaded_scale: None,
            failures_remaining: count,
            init_failures_remaining: 0,
            init_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a mock whose first `count` initialize calls fail with a
    /// backend-class error
    #[must_use]
    pub fn failing_init_times(count: usize) -> Self {
        Self {
            loaded_scale: None,
            failures_remaining: 0,
            init_failures_remaining: count,
            init_calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Default for MockAcceleratedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl UpscaleBackend for MockAcceleratedBackend {
    fn initialize(&mut self, scale: UpscaleFactor) -> Result<Option<Duration>> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if self.init_failures_remaining > 0 {
            self.init_failures_remaining -= 1;
            return Err(PixeliftError::backend(
                "GPU adapter request failed during model load",
            ));
        }
        self.loaded_scale = Some(scale);
        Ok(None)
    }

    fn upscale(
        &mut self,
        input: &RgbaImage,
        on_progress: &mut dyn FnMut(f32),
    ) -> Result<RgbaImage> {
        let scale = self
            .loaded_scale
            .ok_or_else(|| PixeliftError::backend("mock backend not initialized"))?;

        if self.failures_remaining > 0 {
            self.failures_remaining -= 1;
            return Err(PixeliftError::backend(
                "GPU device lost during mock inference",
            ));
        }

        on_progress(0.5);
        let multiplier = scale.multiplier();
        let output = imageops::resize(
            input,
            input.width() * multiplier,
            input.height() * multiplier,
            FilterType::Nearest,
        );
        on_progress(1.0);
        Ok(output)
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Accelerated
    }

    fn loaded_scale(&self) -> Option<UpscaleFactor> {
        self.loaded_scale
    }

    fn is_initialized(&self) -> bool {
        self.loaded_scale.is_some()
    }
}

/// Factory that serves scriptable mock backends
pub struct MockBackendFactory {
    /// Upscale failures to script into each accelerated backend created
    pub accelerated_failures: usize,
    /// Initialize failures to script into each accelerated backend created
    pub accelerated_init_failures: usize,
    /// Whether the factory offers an accelerated backend at all
    pub with_accelerated: bool,
}

impl MockBackendFactory {
    /// Factory offering both backends, accelerated always succeeding
    #[must_use]
    pub fn new() -> Self {
        Self {
            accelerated_failures: 0,
            accelerated_init_failures: 0,
            with_accelerated: true,
        }
    }

    /// Factory whose accelerated backends fail `count` times before working
    #[must_use]
    pub fn with_failing_accelerated(count: usize) -> Self {
        Self {
            accelerated_failures: count,
            ..Self::new()
        }
    }

    /// Factory whose accelerated backends fail to load their model `count`
    /// times before working
    #[must_use]
    pub fn with_failing_accelerated_init(count: usize) -> Self {
        Self {
            accelerated_init_failures: count,
            ..Self::new()
        }
    }
}

impl Default for MockBackendFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendFactory for MockBackendFactory {
    fn create_backend(&self, kind: BackendKind) -> Result<Box<dyn UpscaleBackend>> {
        match kind {
            BackendKind::Accelerated => {
                if self.with_accelerated {
                    let mut backend =
                        MockAcceleratedBackend::failing_times(self.accelerated_failures);
                    backend.init_failures_remaining = self.accelerated_init_failures;
                    Ok(Box::new(backend))
                } else {
                    Err(PixeliftError::backend("no accelerated backend available"))
                }
            },
            BackendKind::Software => Ok(Box::new(crate::backends::SoftwareBackend::new())),
        }
    }

    fn available_backends(&self) -> Vec<BackendKind> {
        if self.with_accelerated {
            vec![BackendKind::Accelerated, BackendKind::Software]
        } else {
            vec![BackendKind::Software]
        }
    }
}
