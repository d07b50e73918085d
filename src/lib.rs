#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # Pixelift
//!
//! A Rust library for staged image enhancement: deterministic pre-processing,
//! AI super-resolution, and bitmap-to-vector tracing, chained into one
//! pipeline with print-resolution metadata injection and a serial batch queue.
//!
//! ## Features
//!
//! - **Staged pipeline**: enhancement, AI upscale, and vectorization can be
//!   enabled independently; each enabled stage consumes the previous stage's
//!   raster output
//! - **Backend degradation**: accelerated upscale backends fall back to the
//!   built-in software backend after a confirmation gate
//! - **Metadata codec**: embeds DPI into PNG (`pHYs` chunk) and JPEG (JFIF
//!   APP0 segment) outputs without re-encoding pixel data
//! - **Serial batch queue**: ordered processing with per-image callbacks,
//!   abort and skip semantics, and continuously tracked counters
//! - **CLI Integration**: optional command-line interface (enable with the
//!   `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pixelift::{process_image_bytes, DpiSetting, OutputTarget, ProcessOptions};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let source = tokio::fs::read("input.png").await?;
//!
//! let options = ProcessOptions::builder()
//!     .basic_enhancement(true)
//!     .dpi(DpiSetting::Fixed(300))
//!     .output_format(OutputTarget::Png)
//!     .build()?;
//!
//! let (result, arena) = process_image_bytes(&source, &options).await?;
//! if let Some(handle) = &result.raster {
//!     if let Some(bytes) = arena.get(handle) {
//!         tokio::fs::write("output.png", bytes.as_slice()).await?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Batch processing goes through [`ProcessingQueue`]; front-ends with an
//! accelerated inference runtime inject it via [`BackendFactory`].

pub mod backends;
#[cfg(feature = "cli")]
pub mod cli;
pub mod codec;
pub mod config;
pub mod enhance;
pub mod error;
pub mod inference;
pub mod processor;
pub mod queue;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;
pub mod upscaler;
pub mod vectorize;

use std::sync::Arc;

// Public API exports
pub use backends::SoftwareBackend;
pub use codec::{read_png_dpi, write_jpeg_dpi, write_png_dpi};
pub use config::{
    DenoiseLevel, DpiSetting, OutputTarget, ProcessOptions, ProcessOptionsBuilder, UpscaleFactor,
    VectorPrecision,
};
pub use error::{PixeliftError, Result};
pub use inference::{BackendFactory, BackendKind, EngineState, UpscaleBackend};
pub use processor::PipelineProcessor;
pub use queue::{NoOpQueueObserver, ProcessingQueue, QueueObserver, QueueStopHandle};
pub use services::{
    BlobArena, BlobHandle, ConsoleProgressReporter, NoOpProgressReporter, PipelineState,
    ProgressReporter, ProgressTracker, ProgressUpdate,
};
pub use types::{BatchStats, ImageItem, ItemStatus, ProcessResult, StageTimings};
pub use upscaler::{AutoConfirmPrompt, DegradationPrompt, UpscaleEngine};
pub use vectorize::{RunTracer, VectorTracer, Vectorizer};

/// Process a single image with default collaborators
///
/// Convenience wrapper for one-off use: builds a processor with the software
/// upscale path and the built-in tracer, runs the pipeline, and returns the
/// result together with the arena holding the output blobs.
///
/// # Errors
///
/// Propagates pipeline failures; see [`PipelineProcessor::process`].
pub async fn process_image_bytes(
    source: &[u8],
    options: &ProcessOptions,
) -> Result<(ProcessResult, Arc<BlobArena>)> {
    options.validate()?;
    let mut processor = PipelineProcessor::new();
    let result = processor.process(source, options)?;
    Ok((result, processor.arena().clone()))
}
