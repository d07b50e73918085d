//! Error types for pipeline processing operations

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PixeliftError>;

/// Comprehensive error types for the processing pipeline
#[derive(Error, Debug)]
pub enum PixeliftError {
    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image format or processing errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Binary input does not match the expected container signature
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Upscale backend errors (accelerated or software inference path)
    #[error("Backend error: {0}")]
    Backend(String),

    /// A pipeline stage failed in a way that aborts the current image
    #[error("Stage '{stage}' failed: {message}")]
    Stage {
        /// Name of the stage that failed
        stage: &'static str,
        /// Failure details
        message: String,
    },

    /// The user declined backend degradation; the whole batch must stop
    #[error("Aborted by user: {0}")]
    UserAborted(String),

    /// The image should be recorded as skipped and the batch continued
    #[error("Skipped: {0}")]
    Skipped(String),

    /// Neither a raster nor a vector output survived output filtering
    #[error("No output produced: raster and vector outputs are both absent")]
    NoOutput,

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Memory allocation or processing errors
    #[error("Processing error: {0}")]
    Processing(String),
}

impl PixeliftError {
    /// Create a new invalid format error
    pub fn invalid_format<S: Into<String>>(msg: S) -> Self {
        Self::InvalidFormat(msg.into())
    }

    /// Create a new backend error
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        Self::Backend(msg.into())
    }

    /// Create a new stage error with stage context
    pub fn stage<S: Into<String>>(stage: &'static str, msg: S) -> Self {
        Self::Stage {
            stage,
            message: msg.into(),
        }
    }

    /// Create a new user-abort error
    pub fn user_aborted<S: Into<String>>(msg: S) -> Self {
        Self::UserAborted(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Whether this error must stop the whole batch rather than skip the image
    #[must_use]
    pub fn is_user_abort(&self) -> bool {
        matches!(self, Self::UserAborted(_))
    }

    /// Whether this error marks the image as skipped rather than failed
    #[must_use]
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }

    /// Whether this error originated in the accelerated backend subsystem
    ///
    /// Used by the upscale engine to decide when degradation to the software
    /// backend is warranted. Matches on the error class and, for wrapped
    /// messages, on mentions of the accelerated subsystem.
    #[must_use]
    pub fn is_backend_class(&self) -> bool {
        match self {
            Self::Backend(_) => true,
            Self::Stage { message, .. } | Self::Processing(message) => {
                let lower = message.to_lowercase();
                lower.contains("gpu") || lower.contains("webgpu") || lower.contains("backend")
            },
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = PixeliftError::invalid_config("test config error");
        assert!(matches!(err, PixeliftError::InvalidConfig(_)));

        let err = PixeliftError::invalid_format("missing PNG signature");
        assert!(matches!(err, PixeliftError::InvalidFormat(_)));
    }

    #[test]
    fn test_error_display() {
        let err = PixeliftError::invalid_config("unsupported scale factor");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: unsupported scale factor"
        );

        let err = PixeliftError::stage("upscale", "inference returned empty buffer");
        assert_eq!(
            err.to_string(),
            "Stage 'upscale' failed: inference returned empty buffer"
        );
    }

    #[test]
    fn test_abort_classification() {
        assert!(PixeliftError::user_aborted("declined fallback").is_user_abort());
        assert!(!PixeliftError::NoOutput.is_user_abort());
        assert!(PixeliftError::Skipped("duplicate".into()).is_skip());
        assert!(!PixeliftError::Skipped("duplicate".into()).is_user_abort());
    }

    #[test]
    fn test_backend_class_detection() {
        assert!(PixeliftError::backend("session lost").is_backend_class());
        assert!(PixeliftError::processing("WebGPU device unavailable").is_backend_class());
        assert!(PixeliftError::stage("upscale", "GPU adapter request failed").is_backend_class());
        assert!(!PixeliftError::NoOutput.is_backend_class());
        assert!(!PixeliftError::processing("decode failure").is_backend_class());
    }
}
