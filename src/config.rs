//! Configuration types for pipeline processing operations

use crate::error::{PixeliftError, Result};
use serde::{Deserialize, Serialize};

/// Supported integer upscale factors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpscaleFactor {
    /// Double each dimension
    X2,
    /// Triple each dimension
    X3,
    /// Quadruple each dimension
    X4,
}

impl UpscaleFactor {
    /// Numeric multiplier for this factor
    #[must_use]
    pub fn multiplier(self) -> u32 {
        match self {
            Self::X2 => 2,
            Self::X3 => 3,
            Self::X4 => 4,
        }
    }

    /// Map an arbitrary integer onto a supported factor
    ///
    /// Unsupported values are silently substituted with the documented
    /// default of 2; the substitution is logged at debug level.
    #[must_use]
    pub fn from_scale(scale: u32) -> Self {
        match scale {
            3 => Self::X3,
            4 => Self::X4,
            2 => Self::X2,
            other => {
                log::debug!("unsupported upscale factor {other}, substituting 2");
                Self::X2
            },
        }
    }
}

impl Default for UpscaleFactor {
    fn default() -> Self {
        Self::X2
    }
}

impl std::fmt::Display for UpscaleFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x", self.multiplier())
    }
}

/// Denoise tier applied by the enhancement stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenoiseLevel {
    /// Identity no-op: contrast and sharpen are skipped entirely
    None,
    /// Gentle contrast stretch and sharpen
    Light,
    /// Moderate contrast stretch and sharpen
    Medium,
    /// Aggressive contrast stretch and sharpen
    Heavy,
}

impl DenoiseLevel {
    /// Per-channel contrast gain for this tier
    #[must_use]
    pub fn contrast_gain(self) -> Option<f32> {
        match self {
            Self::None => None,
            Self::Light => Some(1.15),
            Self::Medium => Some(1.25),
            Self::Heavy => Some(1.35),
        }
    }

    /// Laplacian sharpen strength for this tier
    #[must_use]
    pub fn sharpen_strength(self) -> Option<f32> {
        match self {
            Self::None => None,
            Self::Light => Some(0.3),
            Self::Medium => Some(0.5),
            Self::Heavy => Some(0.7),
        }
    }
}

impl Default for DenoiseLevel {
    fn default() -> Self {
        Self::Light
    }
}

/// Which output kinds a pipeline run should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputTarget {
    /// Vector output only
    Svg,
    /// Raster output only
    Png,
    /// Both raster and vector outputs
    Both,
}

impl OutputTarget {
    /// Whether a raster output is requested
    #[must_use]
    pub fn wants_raster(self) -> bool {
        matches!(self, Self::Png | Self::Both)
    }

    /// Whether a vector output is requested
    #[must_use]
    pub fn wants_vector(self) -> bool {
        matches!(self, Self::Svg | Self::Both)
    }
}

impl Default for OutputTarget {
    fn default() -> Self {
        Self::Png
    }
}

/// Physical density to embed in the raster output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DpiSetting {
    /// Leave the container untouched
    Original,
    /// Embed a concrete dots-per-inch value
    Fixed(u32),
}

impl DpiSetting {
    /// DPI presets offered by the front-ends
    pub const PRESETS: [u32; 4] = [72, 150, 300, 600];

    /// The concrete DPI value, if one was selected
    #[must_use]
    pub fn value(self) -> Option<u32> {
        match self {
            Self::Original => None,
            Self::Fixed(dpi) => Some(dpi),
        }
    }
}

impl Default for DpiSetting {
    fn default() -> Self {
        Self::Original
    }
}

/// Detail retention tier for vectorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VectorPrecision {
    /// Coarse outlines only
    Low,
    /// Balanced detail
    Medium,
    /// Maximum detail retained
    High,
}

impl VectorPrecision {
    /// Binarization threshold for this tier; lower retains more detail
    #[must_use]
    pub fn threshold(self) -> u8 {
        match self {
            Self::High => 128,
            Self::Medium => 150,
            Self::Low => 180,
        }
    }
}

impl Default for VectorPrecision {
    fn default() -> Self {
        Self::Medium
    }
}

/// Per-image processing options, consumed as an immutable snapshot by one
/// pipeline run
///
/// Invariant: when `output_format` requests vector output but
/// `enable_vectorize` is false, the vector output is silently omitted. This
/// is documented behavior, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct ProcessOptions {
    /// Run the deterministic enhancement stage (contrast + sharpen)
    pub enable_basic_enhancement: bool,

    /// Run the AI super-resolution stage
    pub enable_ai_upscale: bool,

    /// Run the bitmap-to-vector tracing stage
    pub enable_vectorize: bool,

    /// Integer scale factor applied to pixel dimensions
    pub upscale_factor: UpscaleFactor,

    /// Denoise tier for the enhancement stage
    pub denoise_level: DenoiseLevel,

    /// Requested output kinds
    pub output_format: OutputTarget,

    /// Physical density to embed during finalization
    pub dpi: DpiSetting,

    /// Detail tier for vectorization
    pub vectorize_precision: VectorPrecision,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            enable_basic_enhancement: true,
            enable_ai_upscale: false,
            enable_vectorize: false,
            upscale_factor: UpscaleFactor::default(),
            denoise_level: DenoiseLevel::default(),
            output_format: OutputTarget::default(),
            dpi: DpiSetting::default(),
            vectorize_precision: VectorPrecision::default(),
        }
    }
}

impl ProcessOptions {
    /// Create a new options builder
    #[must_use]
    pub fn builder() -> ProcessOptionsBuilder {
        ProcessOptionsBuilder::default()
    }

    /// Number of enabled pipeline stages
    #[must_use]
    pub fn enabled_stage_count(&self) -> usize {
        usize::from(self.enable_basic_enhancement)
            + usize::from(self.enable_ai_upscale)
            + usize::from(self.enable_vectorize && self.output_format.wants_vector())
    }

    /// Validate option consistency
    ///
    /// # Errors
    ///
    /// Returns [`PixeliftError::InvalidConfig`] when a fixed DPI is outside
    /// the supported preset range.
    pub fn validate(&self) -> Result<()> {
        if let DpiSetting::Fixed(dpi) = self.dpi {
            if !DpiSetting::PRESETS.contains(&dpi) {
                return Err(PixeliftError::invalid_config(format!(
                    "DPI {dpi} is not one of the supported presets {:?}",
                    DpiSetting::PRESETS
                )));
            }
        }
        Ok(())
    }
}

/// Builder for [`ProcessOptions`]
#[derive(Debug, Default)]
pub struct ProcessOptionsBuilder {
    options: ProcessOptions,
}

impl ProcessOptionsBuilder {
    #[must_use]
    pub fn basic_enhancement(mut self, enabled: bool) -> Self {
        self.options.enable_basic_enhancement = enabled;
        self
    }

    #[must_use]
    pub fn ai_upscale(mut self, enabled: bool) -> Self {
        self.options.enable_ai_upscale = enabled;
        self
    }

    #[must_use]
    pub fn vectorize(mut self, enabled: bool) -> Self {
        self.options.enable_vectorize = enabled;
        self
    }

    #[must_use]
    pub fn upscale_factor(mut self, factor: UpscaleFactor) -> Self {
        self.options.upscale_factor = factor;
        self
    }

    #[must_use]
    pub fn denoise_level(mut self, level: DenoiseLevel) -> Self {
        self.options.denoise_level = level;
        self
    }

    #[must_use]
    pub fn output_format(mut self, format: OutputTarget) -> Self {
        self.options.output_format = format;
        self
    }

    #[must_use]
    pub fn dpi(mut self, dpi: DpiSetting) -> Self {
        self.options.dpi = dpi;
        self
    }

    #[must_use]
    pub fn vectorize_precision(mut self, precision: VectorPrecision) -> Self {
        self.options.vectorize_precision = precision;
        self
    }

    /// Build the options snapshot
    ///
    /// # Errors
    ///
    /// Returns [`PixeliftError::InvalidConfig`] when validation fails.
    pub fn build(self) -> Result<ProcessOptions> {
        self.options.validate()?;
        Ok(self.options)
    }
}
