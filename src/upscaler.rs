//! Upscaling collaborator adapter
//!
//! Normalizes calls to the super-resolution capability: scale-factor
//! validation, backend selection with a single degradation path
//! (accelerated → software), model re-initialization only on scale change,
//! and an interactive abort gate when degradation is needed.

use crate::config::UpscaleFactor;
use crate::error::{PixeliftError, Result};
use crate::inference::{BackendFactory, BackendKind, EngineState, UpscaleBackend};
use image::RgbaImage;

/// Either input dimension above this is logged as a memory risk
const OVERSIZE_THRESHOLD: u32 = 2000;

/// Synchronous confirmation gate consulted before degrading to the software
/// backend
///
/// Declining stops the whole batch: the engine fails with `UserAborted`
/// rather than an ordinary error.
pub trait DegradationPrompt: Send + Sync {
    /// Whether processing should continue on the software backend
    fn confirm_software_fallback(&self, reason: &str) -> bool;
}

/// Prompt that always accepts degradation (non-interactive front-ends)
pub struct AutoConfirmPrompt;

impl DegradationPrompt for AutoConfirmPrompt {
    fn confirm_software_fallback(&self, reason: &str) -> bool {
        log::warn!("degrading to software backend without confirmation: {reason}");
        true
    }
}

/// Default backend factory: software only
///
/// Front-ends with access to an accelerated runtime provide their own
/// factory; this one keeps the library usable standalone.
pub struct DefaultBackendFactory;

impl BackendFactory for DefaultBackendFactory {
    fn create_backend(&self, kind: BackendKind) -> Result<Box<dyn UpscaleBackend>> {
        match kind {
            BackendKind::Software => Ok(Box::new(crate::backends::SoftwareBackend::new())),
            BackendKind::Accelerated => Err(PixeliftError::backend(
                "accelerated backend not available. Must be injected by the frontend.",
            )),
        }
    }

    fn available_backends(&self) -> Vec<BackendKind> {
        vec![BackendKind::Software]
    }
}

/// Process-wide upscale resource with explicit lifecycle
///
/// Lazy init on first use, re-init on scale change, explicit dispose on full
/// reset. Not safe for concurrent invocations; the serial queue is the sole
/// safety net.
pub struct UpscaleEngine {
    factory: Box<dyn BackendFactory>,
    prompt: Box<dyn DegradationPrompt>,
    backend: Option<Box<dyn UpscaleBackend>>,
    state: EngineState,
}

impl UpscaleEngine {
    /// Create an engine with the default (software-only) factory
    #[must_use]
    pub fn new() -> Self {
        Self::with_factory(Box::new(DefaultBackendFactory))
    }

    /// Create an engine with an injected backend factory
    #[must_use]
    pub fn with_factory(factory: Box<dyn BackendFactory>) -> Self {
        Self {
            factory,
            prompt: Box::new(AutoConfirmPrompt),
            backend: None,
            state: EngineState::Unloaded,
        }
    }

    /// Replace the degradation confirmation gate
    #[must_use]
    pub fn with_prompt(mut self, prompt: Box<dyn DegradationPrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Kind of the currently active backend, if any
    #[must_use]
    pub fn active_backend(&self) -> Option<BackendKind> {
        self.backend.as_ref().map(|b| b.kind())
    }

    /// Ensure a backend is loaded for the given scale
    ///
    /// The model is re-initialized only when the requested scale differs
    /// from the currently loaded one.
    fn acquire(&mut self, scale: UpscaleFactor) -> Result<()> {
        if self.backend.is_none() {
            self.state = EngineState::Loading;
            let preferred = self
                .factory
                .available_backends()
                .into_iter()
                .next()
                .unwrap_or(BackendKind::Software);
            let backend = self.factory.create_backend(preferred)?;
            log::info!("created {preferred} upscale backend");
            self.backend = Some(backend);
        }

        let backend = self.backend.as_mut().expect("backend just ensured");
        if backend.loaded_scale() != Some(scale) {
            self.state = EngineState::Loading;
            backend.initialize(scale)?;
            log::debug!("loaded {scale} model on {} backend", backend.kind());
        }

        if self.state != EngineState::Degraded {
            self.state = EngineState::Ready;
        }
        Ok(())
    }

    /// Swap the active backend for the software fallback and reload the model
    fn degrade(&mut self, scale: UpscaleFactor) -> Result<()> {
        let mut software = self.factory.create_backend(BackendKind::Software)?;
        software.initialize(scale)?;
        self.backend = Some(software);
        self.state = EngineState::Degraded;
        log::info!("upscale engine degraded to software backend");
        Ok(())
    }

    /// Confirm degradation with the gate, then swap in the software backend
    ///
    /// Declining yields `UserAborted` so the queue stops the batch instead
    /// of skipping the image.
    fn confirm_and_degrade(&mut self, scale: UpscaleFactor, reason: &str) -> Result<()> {
        if !self.prompt.confirm_software_fallback(reason) {
            return Err(PixeliftError::user_aborted(format!(
                "software fallback declined after: {reason}"
            )));
        }
        self.degrade(scale)
    }

    /// Run super-resolution at the given raw scale factor
    ///
    /// Unsupported factors are silently substituted with the documented
    /// default of 2. Oversized inputs are logged as a risk, not rejected.
    ///
    /// # Errors
    ///
    /// Returns [`PixeliftError::UserAborted`] when a backend-class failure
    /// occurs (during model load or inference) and the confirmation gate
    /// declines degradation; other errors propagate as-is.
    pub fn upscale(
        &mut self,
        input: &RgbaImage,
        scale: u32,
        on_progress: &mut dyn FnMut(f32),
    ) -> Result<RgbaImage> {
        let factor = UpscaleFactor::from_scale(scale);

        let (width, height) = input.dimensions();
        if width > OVERSIZE_THRESHOLD || height > OVERSIZE_THRESHOLD {
            log::warn!(
                "input is {width}x{height}; dimensions above {OVERSIZE_THRESHOLD}px risk high memory use during {factor} upscaling"
            );
        }

        // Model-load failures on the accelerated path degrade through the
        // same gate as inference failures.
        if let Err(err) = self.acquire(factor) {
            if !err.is_backend_class() || self.active_backend() == Some(BackendKind::Software) {
                return Err(err);
            }
            let reason = err.to_string();
            log::warn!("accelerated backend failed to load: {reason}");
            self.confirm_and_degrade(factor, &reason)?;
        }
        let backend = self.backend.as_mut().expect("backend acquired");

        match backend.upscale(input, on_progress) {
            Ok(output) => Ok(output),
            Err(err)
                if err.is_backend_class() && backend.kind() == BackendKind::Accelerated =>
            {
                let reason = err.to_string();
                log::warn!("accelerated backend failed: {reason}");
                self.confirm_and_degrade(factor, &reason)?;
                let backend = self.backend.as_mut().expect("software backend installed");
                backend.upscale(input, on_progress)
            },
            Err(err) => Err(err),
        }
    }

    /// Tear down the loaded model and backend
    ///
    /// Mirrors the application-level full reset; the next upscale lazily
    /// re-initializes from scratch.
    pub fn dispose(&mut self) {
        if self.backend.take().is_some() {
            log::debug!("upscale engine disposed");
        }
        self.state = EngineState::Unloaded;
    }
}

impl Default for UpscaleEngine {
    fn default() -> Self {
        Self::new()
    }
}
