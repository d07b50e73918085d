//! Unified pipeline processor
//!
//! Sequences the enabled stages for one image, threading the raster output
//! of each enabled stage into the next, computing the progress budget, and
//! applying the metadata codec to the final raster output.

use crate::{
    codec,
    config::ProcessOptions,
    enhance,
    error::{PixeliftError, Result},
    services::{
        BlobArena, BlobHandle, NoOpProgressReporter, PipelineState, ProgressReporter,
        ProgressTracker, StageBudget,
    },
    types::{ProcessResult, StageTimings},
    upscaler::UpscaleEngine,
    vectorize::Vectorizer,
};
use image::RgbaImage;
use instant::Instant;
use std::io::Cursor;
use std::sync::Arc;
use tracing::instrument;

/// Encode an RGBA buffer as PNG bytes
fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .map_err(|e| PixeliftError::processing(format!("failed to encode raster output: {e}")))?;
    Ok(bytes)
}

/// Pipeline processor driving one image through the enabled stages
///
/// Owns the shared upscale engine and vectorizer; the serial queue is the
/// sole guard against concurrent invocations.
pub struct PipelineProcessor {
    engine: UpscaleEngine,
    vectorizer: Vectorizer,
    arena: Arc<BlobArena>,
    reporter: Arc<dyn ProgressReporter>,
}

impl PipelineProcessor {
    /// Create a processor with default collaborators and a fresh arena
    #[must_use]
    pub fn new() -> Self {
        Self::with_parts(
            UpscaleEngine::new(),
            Vectorizer::new(),
            Arc::new(BlobArena::new()),
        )
    }

    /// Create a processor from injected collaborators
    #[must_use]
    pub fn with_parts(
        engine: UpscaleEngine,
        vectorizer: Vectorizer,
        arena: Arc<BlobArena>,
    ) -> Self {
        Self {
            engine,
            vectorizer,
            arena,
            reporter: Arc::new(NoOpProgressReporter),
        }
    }

    /// Replace the progress reporter
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Arena holding the blobs behind returned handles
    #[must_use]
    pub fn arena(&self) -> &Arc<BlobArena> {
        &self.arena
    }

    /// Mutable access to the upscale engine (for teardown on full reset)
    pub fn engine_mut(&mut self) -> &mut UpscaleEngine {
        &mut self.engine
    }

    /// Process one image through the enabled stages
    ///
    /// # Errors
    ///
    /// - [`PixeliftError::UserAborted`] when the user declines backend
    ///   degradation during the AI upscale stage
    /// - [`PixeliftError::NoOutput`] when neither requested output survives
    ///   output filtering
    /// - Decode, enhancement, and upscale failures propagate; vectorization
    ///   failures are recovered locally
    #[instrument(skip(self, source, options), fields(bytes = source.len()))]
    pub fn process(&mut self, source: &[u8], options: &ProcessOptions) -> Result<ProcessResult> {
        let total_start = Instant::now();
        let mut timings = StageTimings::default();

        let wants_raster = options.output_format.wants_raster();
        let wants_vector = options.output_format.wants_vector();
        if wants_vector && !options.enable_vectorize {
            log::info!("vector output requested without enabling vectorization; omitting");
        }
        let run_vectorize = options.enable_vectorize && wants_vector;

        let decoded = image::load_from_memory(source)
            .map_err(|e| PixeliftError::processing(format!("failed to decode source image: {e}")))?
            .to_rgba8();

        let enabled_stages = options.enabled_stage_count();
        let budget = StageBudget::new(enabled_stages);
        let mut tracker = ProgressTracker::new(self.reporter.clone());
        let mut stage_index = 0usize;

        // Stage chaining state: each enabled stage consumes the raster output
        // of the previous enabled stage. `current_bytes` is the encoded form
        // handed between stages; `last_good` backs the degradation path when
        // an intermediate cannot be rehydrated.
        let mut current_bytes = source.to_vec();
        let mut last_good = decoded;
        let mut raster_produced = false;

        // Zero enabled stages still yields a raster when one is wanted
        let run_enhancement = options.enable_basic_enhancement
            || (enabled_stages == 0 && wants_raster);

        if run_enhancement {
            tracker.report(PipelineState::Enhancing, budget.stage_start(stage_index));
            let stage_start = Instant::now();

            let input = self.rehydrate(&current_bytes, &last_good);
            // The upscale factor is owned by the AI stage when it is enabled;
            // otherwise the enhancement resize is the only scaler.
            let scale = if options.enable_ai_upscale {
                1.0
            } else {
                options.upscale_factor.multiplier() as f32
            };
            let output = enhance::enhance(&input, scale, options.denoise_level);

            current_bytes = encode_png(&output)?;
            last_good = output;
            raster_produced = true;
            timings.enhance_ms = stage_start.elapsed().as_millis() as u64;

            tracker.report(PipelineState::Enhancing, budget.stage_end(stage_index));
            if options.enable_basic_enhancement {
                stage_index += 1;
            }
        }

        if options.enable_ai_upscale {
            tracker.report(PipelineState::Upscaling, budget.stage_start(stage_index));
            let stage_start = Instant::now();

            let input = self.rehydrate(&current_bytes, &last_good);
            let index = stage_index;
            let output = {
                let tracker_ref = &mut tracker;
                // Upscale failures are deliberately not caught here: they
                // abort the whole image and propagate to the queue.
                self.engine.upscale(
                    &input,
                    options.upscale_factor.multiplier(),
                    &mut |fraction| {
                        tracker_ref.report(
                            PipelineState::Upscaling,
                            budget.within_stage(index, fraction),
                        );
                    },
                )?
            };

            current_bytes = encode_png(&output)?;
            last_good = output;
            raster_produced = true;
            timings.upscale_ms = stage_start.elapsed().as_millis() as u64;

            tracker.report(PipelineState::Upscaling, budget.stage_end(stage_index));
            stage_index += 1;
        }

        let mut vector_output: Option<String> = None;
        if run_vectorize {
            tracker.report(PipelineState::Vectorizing, budget.stage_start(stage_index));
            let stage_start = Instant::now();

            let input = self.rehydrate(&current_bytes, &last_good);
            match self.vectorizer.vectorize(&input, options.vectorize_precision) {
                Ok(svg) => vector_output = Some(svg),
                Err(e) => {
                    // Recovered locally: this image proceeds without vector output
                    log::warn!("vectorization failed, continuing without vector output: {e}");
                    tracker.report_error(PipelineState::Vectorizing, &e.to_string());
                },
            }

            timings.vectorize_ms = stage_start.elapsed().as_millis() as u64;
            tracker.report(PipelineState::Vectorizing, budget.stage_end(stage_index));
        }

        let result = self.finalize(
            FinalizeInputs {
                current_bytes,
                raster_produced,
                vector_output,
                wants_raster,
                wants_vector,
            },
            options,
            &mut timings,
            &mut tracker,
        );

        match &result {
            Ok(_) => tracker.report(PipelineState::Done, 100),
            Err(e) => tracker.report_error(PipelineState::Failed, &e.to_string()),
        }
        log::debug!(
            "pipeline run ended at {}% after {}ms",
            tracker.current(),
            tracker.elapsed_ms()
        );

        result.map(|mut r| {
            r.timings.total_ms = total_start.elapsed().as_millis() as u64;
            r
        })
    }

    /// Decode the encoded intermediate, degrading to the previous stage's
    /// raw input when the conversion fails
    fn rehydrate(&self, bytes: &[u8], last_good: &RgbaImage) -> RgbaImage {
        match image::load_from_memory(bytes) {
            Ok(img) => img.to_rgba8(),
            Err(e) => {
                log::warn!("failed to rehydrate intermediate raster, reusing previous input: {e}");
                last_good.clone()
            },
        }
    }

    /// Metadata injection and output filtering
    fn finalize(
        &mut self,
        inputs: FinalizeInputs,
        options: &ProcessOptions,
        timings: &mut StageTimings,
        tracker: &mut ProgressTracker,
    ) -> Result<ProcessResult> {
        tracker.report(PipelineState::Finalizing, 85);
        let stage_start = Instant::now();

        let FinalizeInputs {
            current_bytes,
            raster_produced,
            vector_output,
            wants_raster,
            wants_vector,
        } = inputs;

        let mut raster_handle: Option<BlobHandle> = if raster_produced {
            Some(self.arena.create(current_bytes))
        } else {
            None
        };

        // DPI injection replaces the raster handle and releases the prior
        // one so superseded blobs never accumulate across a batch.
        if let (Some(handle), true, Some(dpi)) =
            (raster_handle.as_ref(), wants_raster, options.dpi.value())
        {
            if let Some(bytes) = self.arena.get(handle) {
                match codec::write_png_dpi(&bytes, dpi) {
                    Ok(tagged) => {
                        let new_handle = self.arena.create(tagged);
                        self.arena.release(handle);
                        raster_handle = Some(new_handle);
                        log::debug!("embedded {dpi} dpi into raster output");
                    },
                    Err(e) => {
                        // Keep the unmodified buffer on format mismatch
                        log::warn!("metadata injection skipped: {e}");
                    },
                }
            }
        }

        let vector_handle = vector_output.map(|svg| self.arena.create(svg.into_bytes()));

        // Output filtering: release anything that was produced but not wanted
        if !wants_raster {
            if let Some(handle) = raster_handle.take() {
                self.arena.release(&handle);
            }
        }
        let vector_handle = match (vector_handle, wants_vector) {
            (Some(handle), false) => {
                self.arena.release(&handle);
                None
            },
            (handle, _) => handle,
        };

        if raster_handle.is_none() && vector_handle.is_none() {
            return Err(PixeliftError::NoOutput);
        }

        let raster_bytes = raster_handle
            .as_ref()
            .and_then(|h| self.arena.get(h))
            .map_or(0, |b| b.len());

        timings.finalize_ms = stage_start.elapsed().as_millis() as u64;
        Ok(ProcessResult {
            raster: raster_handle,
            vector: vector_handle,
            raster_bytes,
            timings: timings.clone(),
        })
    }
}

impl Default for PipelineProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Bundled arguments for the finalization step
struct FinalizeInputs {
    current_bytes: Vec<u8>,
    raster_produced: bool,
    vector_output: Option<String>,
    wants_raster: bool,
    wants_vector: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::test_utils::MockBackendFactory;
    use crate::config::{OutputTarget, ProcessOptions, UpscaleFactor};
    use image::Rgba;

    fn source_png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 23 % 256) as u8, (y * 31 % 256) as u8, 128, 255])
        });
        encode_png(&image).unwrap()
    }

    fn mock_processor() -> PipelineProcessor {
        PipelineProcessor::with_parts(
            UpscaleEngine::with_factory(Box::new(MockBackendFactory::new())),
            Vectorizer::new(),
            Arc::new(BlobArena::new()),
        )
    }

    fn decode_result_raster(processor: &PipelineProcessor, result: &ProcessResult) -> RgbaImage {
        let bytes = processor.arena.get(result.raster.as_ref().unwrap()).unwrap();
        image::load_from_memory(&bytes).unwrap().to_rgba8()
    }

    #[test]
    fn test_default_fallback_when_all_stages_disabled() {
        let mut processor = mock_processor();
        let options = ProcessOptions::builder()
            .basic_enhancement(false)
            .ai_upscale(false)
            .vectorize(false)
            .output_format(OutputTarget::Png)
            .upscale_factor(UpscaleFactor::X2)
            .build()
            .unwrap();

        let result = processor.process(&source_png(6, 4), &options).unwrap();
        assert!(result.raster.is_some());
        assert!(result.vector.is_none());

        // The fallback enhancement pass applies the upscale factor
        let raster = decode_result_raster(&processor, &result);
        assert_eq!(raster.dimensions(), (12, 8));
    }

    #[test]
    fn test_ai_stage_owns_the_scale_factor() {
        let mut processor = mock_processor();
        let options = ProcessOptions::builder()
            .basic_enhancement(true)
            .ai_upscale(true)
            .output_format(OutputTarget::Png)
            .upscale_factor(UpscaleFactor::X3)
            .build()
            .unwrap();

        let result = processor.process(&source_png(5, 5), &options).unwrap();
        // Enhancement ran at scale 1, the AI stage tripled the dimensions once
        let raster = decode_result_raster(&processor, &result);
        assert_eq!(raster.dimensions(), (15, 15));
    }

    #[test]
    fn test_vector_requested_without_vectorize_is_omitted() {
        let mut processor = mock_processor();
        let options = ProcessOptions::builder()
            .basic_enhancement(true)
            .vectorize(false)
            .output_format(OutputTarget::Both)
            .build()
            .unwrap();

        let result = processor.process(&source_png(4, 4), &options).unwrap();
        assert!(result.raster.is_some());
        assert!(result.vector.is_none());
    }

    #[test]
    fn test_svg_only_releases_unwanted_raster() {
        let mut processor = mock_processor();
        let options = ProcessOptions::builder()
            .basic_enhancement(true)
            .vectorize(true)
            .output_format(OutputTarget::Svg)
            .build()
            .unwrap();

        let result = processor.process(&source_png(4, 4), &options).unwrap();
        assert!(result.raster.is_none());
        assert!(result.vector.is_some());
        // Only the vector blob remains outstanding
        assert_eq!(processor.arena.outstanding(), 1);
    }

    #[test]
    fn test_no_output_is_a_hard_failure() {
        let mut processor = mock_processor();
        // Svg wanted, vectorize disabled: vector silently omitted, raster unwanted
        let options = ProcessOptions::builder()
            .basic_enhancement(true)
            .vectorize(false)
            .output_format(OutputTarget::Svg)
            .build()
            .unwrap();

        let err = processor.process(&source_png(4, 4), &options).unwrap_err();
        assert!(matches!(err, PixeliftError::NoOutput));
        // Everything produced along the way was released
        assert_eq!(processor.arena.outstanding(), 0);
    }

    #[test]
    fn test_dpi_injection_replaces_raster_handle() {
        let mut processor = mock_processor();
        let options = ProcessOptions::builder()
            .basic_enhancement(true)
            .dpi(crate::config::DpiSetting::Fixed(300))
            .output_format(OutputTarget::Png)
            .build()
            .unwrap();

        let result = processor.process(&source_png(4, 4), &options).unwrap();
        let bytes = processor.arena.get(result.raster.as_ref().unwrap()).unwrap();
        assert_eq!(codec::read_png_dpi(&bytes).unwrap(), Some(300));
        // The pre-injection handle was released
        assert_eq!(processor.arena.outstanding(), 1);
    }

    #[test]
    fn test_undecodable_source_fails() {
        let mut processor = mock_processor();
        let err = processor
            .process(&[0xDE, 0xAD, 0xBE, 0xEF], &ProcessOptions::default())
            .unwrap_err();
        assert!(matches!(err, PixeliftError::Processing(_)));
    }
}
