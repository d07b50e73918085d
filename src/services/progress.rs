//! Progress reporting service
//!
//! Separates progress reporting concerns from pipeline logic so different
//! front-ends can implement their own progress handling. The pipeline emits a
//! discrete state/progress event per stage transition; subscribers own no
//! pipeline logic.

use instant::Instant;
use serde::{Deserialize, Serialize};

/// Share of the progress range reserved for setup before the first stage
const SETUP_BUDGET: f32 = 10.0;

/// Share of the progress range split evenly across enabled stages
const STAGE_POOL: f32 = 70.0;

/// Pipeline states visited while processing one image
///
/// Disabled stages are skipped without a state visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    /// Not yet started
    Idle,
    /// Running the deterministic enhancement stage
    Enhancing,
    /// Running the AI super-resolution stage
    Upscaling,
    /// Running the bitmap-to-vector tracing stage
    Vectorizing,
    /// Embedding metadata and filtering outputs
    Finalizing,
    /// Processing completed
    Done,
    /// Processing failed
    Failed,
}

impl PipelineState {
    /// Human-readable description of the state
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Idle => "Waiting to start",
            Self::Enhancing => "Enhancing image",
            Self::Upscaling => "Running AI upscale",
            Self::Vectorizing => "Tracing vector outline",
            Self::Finalizing => "Finalizing outputs",
            Self::Done => "Processing completed",
            Self::Failed => "Processing failed",
        }
    }
}

/// Progress update containing state and timing information
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// Current pipeline state
    pub state: PipelineState,
    /// Progress percentage (0-100), strictly increasing per image
    pub progress: u8,
    /// Human-readable state description
    pub description: String,
    /// Elapsed time since processing started (milliseconds)
    pub elapsed_ms: u64,
}

impl ProgressUpdate {
    /// Create a new progress update
    #[must_use]
    pub fn new(state: PipelineState, progress: u8, start_time: Instant) -> Self {
        Self {
            progress,
            description: state.description().to_string(),
            elapsed_ms: start_time.elapsed().as_millis() as u64,
            state,
        }
    }
}

/// Trait for reporting progress during pipeline processing
pub trait ProgressReporter: Send + Sync {
    /// Report a progress update
    fn report_progress(&self, update: ProgressUpdate);

    /// Report an error during processing
    fn report_error(&self, state: PipelineState, error: &str);
}

/// No-op progress reporter that discards all progress updates
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report_progress(&self, _update: ProgressUpdate) {
        // Intentionally empty - discards progress updates
    }

    fn report_error(&self, _state: PipelineState, _error: &str) {
        // Intentionally empty - discards error reports
    }
}

/// Console progress reporter that logs progress via the log facade
pub struct ConsoleProgressReporter {
    verbose: bool,
}

impl ConsoleProgressReporter {
    /// Create a new console progress reporter
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        if self.verbose {
            log::info!(
                "[{}%] {} ({}ms elapsed)",
                update.progress,
                update.description,
                update.elapsed_ms
            );
        } else {
            log::info!("[{}%] {}", update.progress, update.description);
        }
    }

    fn report_error(&self, state: PipelineState, error: &str) {
        log::error!("Error during {}: {}", state.description(), error);
    }
}

/// Per-image progress budget: a 70-point pool split evenly across enabled
/// stages, with the remaining 30 points reserved for setup and finalization
#[derive(Debug, Clone, Copy)]
pub struct StageBudget {
    per_stage: f32,
}

impl StageBudget {
    /// Compute the budget for a run with the given number of enabled stages
    #[must_use]
    pub fn new(enabled_stages: usize) -> Self {
        let per_stage = if enabled_stages == 0 {
            0.0
        } else {
            STAGE_POOL / enabled_stages as f32
        };
        Self { per_stage }
    }

    /// Progress value at which the stage with this zero-based index begins
    #[must_use]
    pub fn stage_start(&self, index: usize) -> u8 {
        (SETUP_BUDGET + self.per_stage * index as f32).round() as u8
    }

    /// Progress value at which the stage with this zero-based index ends
    #[must_use]
    pub fn stage_end(&self, index: usize) -> u8 {
        (SETUP_BUDGET + self.per_stage * (index as f32 + 1.0)).round() as u8
    }

    /// Map a fraction within a stage onto the overall progress range
    #[must_use]
    pub fn within_stage(&self, index: usize, fraction: f32) -> u8 {
        let fraction = fraction.clamp(0.0, 1.0);
        (SETUP_BUDGET + self.per_stage * (index as f32 + fraction)).round() as u8
    }
}

/// Tracker that enforces strictly increasing progress per image
pub struct ProgressTracker {
    reporter: std::sync::Arc<dyn ProgressReporter>,
    start_time: Instant,
    last_progress: u8,
}

impl ProgressTracker {
    /// Create a tracker reporting through the given reporter
    #[must_use]
    pub fn new(reporter: std::sync::Arc<dyn ProgressReporter>) -> Self {
        Self {
            reporter,
            start_time: Instant::now(),
            last_progress: 0,
        }
    }

    /// Report a state transition at the given progress value
    ///
    /// Regressions are clamped so callbacks observe a monotonic sequence.
    pub fn report(&mut self, state: PipelineState, progress: u8) {
        let progress = progress.clamp(self.last_progress, 100);
        if progress > self.last_progress {
            self.last_progress = progress;
            self.reporter
                .report_progress(ProgressUpdate::new(state, progress, self.start_time));
        }
    }

    /// Report an error in the given state
    pub fn report_error(&self, state: PipelineState, error: &str) {
        self.reporter.report_error(state, error);
    }

    /// Last progress value reported
    #[must_use]
    pub fn current(&self) -> u8 {
        self.last_progress
    }

    /// Elapsed time since the tracker was created
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }
}
