//! Upscale backend abstraction

use crate::config::UpscaleFactor;
use crate::error::Result;
use image::RgbaImage;

// Use instant crate for cross-platform time compatibility
use instant::Duration;

/// Which inference path a backend runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Hardware-accelerated inference (preferred when available)
    Accelerated,
    /// Pure-software inference (degradation target, always available)
    Software,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accelerated => write!(f, "accelerated"),
            Self::Software => write!(f, "software"),
        }
    }
}

/// Lifecycle of the process-wide upscale resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No model loaded
    Unloaded,
    /// Model load in flight
    Loading,
    /// Model loaded on the preferred backend
    Ready,
    /// Model loaded on the software fallback after degradation
    Degraded,
}

/// Trait for super-resolution inference backends
///
/// Backends are stateful: a model is loaded for one scale factor at a time
/// and re-initialized only when the requested scale changes. Implementations
/// are not thread-safe across concurrent invocations; the serial queue is the
/// sole safety net.
pub trait UpscaleBackend: Send {
    /// Load the model for the given scale factor
    ///
    /// Returns the model load time when one was measured.
    ///
    /// # Errors
    /// - Backend initialization failures
    /// - Model loading or validation errors
    fn initialize(&mut self, scale: UpscaleFactor) -> Result<Option<Duration>>;

    /// Run super-resolution on the input buffer
    ///
    /// `on_progress` receives coarse completion fractions in [0, 1].
    ///
    /// # Errors
    /// - Backend not initialized
    /// - Inference failures (backend-class errors mention the accelerated
    ///   subsystem and are keyword-matchable)
    fn upscale(
        &mut self,
        input: &RgbaImage,
        on_progress: &mut dyn FnMut(f32),
    ) -> Result<RgbaImage>;

    /// Which inference path this backend runs on
    fn kind(&self) -> BackendKind;

    /// Scale factor of the currently loaded model, if any
    fn loaded_scale(&self) -> Option<UpscaleFactor>;

    /// Check if the backend is initialized
    fn is_initialized(&self) -> bool;
}

/// Factory trait for creating upscale backends
///
/// Front-ends with access to an accelerated runtime inject it here; the
/// default factory only provides the software path.
pub trait BackendFactory: Send + Sync {
    /// Create a backend instance of the specified kind
    ///
    /// # Errors
    ///
    /// Returns an error for backend kinds this factory cannot provide.
    fn create_backend(&self, kind: BackendKind) -> Result<Box<dyn UpscaleBackend>>;

    /// List available backend kinds, preferred first
    fn available_backends(&self) -> Vec<BackendKind>;
}
