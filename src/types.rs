//! Core data types for pipeline processing

use crate::config::ProcessOptions;
use crate::services::BlobHandle;
use serde::{Deserialize, Serialize};

/// Lifecycle status of an image in a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    /// Waiting in the batch
    Pending,
    /// Currently being processed
    Processing,
    /// Finished with at least one output
    Completed,
    /// Finished with an error
    Failed,
    /// Recorded as skipped and the batch continued
    Skipped,
}

impl Default for ItemStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Per-stage timings recorded on every result (milliseconds)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageTimings {
    /// Enhancement stage duration
    pub enhance_ms: u64,
    /// AI upscale stage duration
    pub upscale_ms: u64,
    /// Vectorization stage duration
    pub vectorize_ms: u64,
    /// Metadata injection and output filtering duration
    pub finalize_ms: u64,
    /// Total wall-clock duration of the pipeline run
    pub total_ms: u64,
}

/// Output of one successful pipeline run
///
/// Invariant: at least one of `raster`/`vector` is present; a run that ends
/// with neither fails with `NoOutput` instead of returning a result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessResult {
    /// Handle to the encoded raster output, when produced
    pub raster: Option<BlobHandle>,
    /// Handle to the SVG document, when produced
    pub vector: Option<BlobHandle>,
    /// Size of the encoded raster output in bytes (0 when absent)
    pub raster_bytes: usize,
    /// Detailed stage timings for the run
    pub timings: StageTimings,
}

impl ProcessResult {
    /// Total processing duration in milliseconds
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.timings.total_ms
    }
}

/// One image in a processing batch
///
/// Created on ingestion and mutated only by the queue during a run. The
/// transient preview handle is released along with the item.
#[derive(Debug, Clone)]
pub struct ImageItem {
    /// Caller-supplied identity
    pub id: String,
    /// Owned source binary
    pub file: Vec<u8>,
    /// Display-only handle to a transient preview resource
    pub original_url: Option<BlobHandle>,
    /// Current lifecycle status
    pub status: ItemStatus,
    /// Progress percentage (0-100)
    pub progress: u8,
    /// Immutable options snapshot for this image
    pub options: ProcessOptions,
    /// Result, present once processing completed
    pub result: Option<ProcessResult>,
    /// Short failure reason, present once processing failed
    pub error: Option<String>,
}

impl ImageItem {
    /// Create a pending item from source bytes
    #[must_use]
    pub fn new<S: Into<String>>(id: S, file: Vec<u8>, options: ProcessOptions) -> Self {
        Self {
            id: id.into(),
            file,
            original_url: None,
            status: ItemStatus::Pending,
            progress: 0,
            options,
            result: None,
            error: None,
        }
    }
}

/// Continuously tracked batch counters
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BatchStats {
    /// Items finished with at least one output
    pub completed: usize,
    /// Items finished with an error
    pub failed: usize,
    /// Items recorded as skipped
    pub skipped: usize,
    /// Total items in the batch
    pub total: usize,
}

impl BatchStats {
    /// Items not yet processed
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.total
            .saturating_sub(self.completed + self.failed + self.skipped)
    }
}
